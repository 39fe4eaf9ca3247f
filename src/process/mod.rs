/*!
 * Process Module
 * Command execution, output streaming, and process image replacement
 */

pub mod environment;
pub mod loader;
pub mod path;
pub mod shell;
pub mod types;

// Re-export for convenience
pub use environment::{FixedEnvironment, HostEnvironment, SystemEnvironment};
pub use loader::ProcessLoader;
pub use shell::{CommandStreamer, OutputChunk, OutputSink, RunningCommand};
pub use types::{
    ExecRequest, LoaderError, LoaderResult, OutputOrigin, ShellError, ShellRequest, ShellResult,
};
