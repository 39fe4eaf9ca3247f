/*!
 * Process Types
 * Requests and errors for command execution and image replacement
 */

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;
use tonic::Status;

/// Shell operation result
pub type ShellResult<T> = Result<T, ShellError>;

/// Loader operation result
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Which pipe a chunk of output was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputOrigin {
    Stdout,
    Stderr,
}

impl OutputOrigin {
    #[inline]
    pub const fn is_stdout(self) -> bool {
        matches!(self, OutputOrigin::Stdout)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OutputOrigin::Stdout => "stdout",
            OutputOrigin::Stderr => "stderr",
        }
    }
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("command cannot be empty")]
    EmptyCommand,

    #[error("failed to get working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),

    #[error("failed to create {0} pipe")]
    PipeUnavailable(&'static str),

    #[error("failed to start command: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("error streaming output: {0}")]
    Stream(String),

    #[error("command failed: {0}")]
    CommandFailed(String),
}

impl From<ShellError> for Status {
    fn from(err: ShellError) -> Self {
        match err {
            ShellError::EmptyCommand => Status::invalid_argument(err.to_string()),
            _ => Status::internal(err.to_string()),
        }
    }
}

/// Process image replacement errors
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("path cannot be empty")]
    EmptyPath,

    #[error("command not found: {0}")]
    NotFound(String),

    #[error("{0} contains an interior nul byte")]
    InvalidString(String),

    #[error("failed to exec: {0}")]
    ExecFailed(#[source] nix::Error),
}

impl From<LoaderError> for Status {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::EmptyPath => Status::invalid_argument(err.to_string()),
            LoaderError::NotFound(_) => Status::not_found(err.to_string()),
            LoaderError::InvalidString(_) | LoaderError::ExecFailed(_) => {
                Status::internal(err.to_string())
            }
        }
    }
}

/// A shell request after wire decoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellRequest {
    pub command: String,
    pub shell: String,
    pub working_dir: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl ShellRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

/// Fully resolved invocation: no defaults left to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: Vec<(OsString, OsString)>,
}

/// An exec request, from the wire or from the command line.
///
/// Everything stays an OS string so argv and environment bytes reach
/// execve unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecRequest {
    pub path: OsString,
    pub args: Vec<OsString>,
    pub env: HashMap<OsString, OsString>,
}

impl ExecRequest {
    pub fn new(path: impl Into<OsString>, args: Vec<OsString>) -> Self {
        Self {
            path: path.into(),
            args,
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<OsString, OsString>) -> Self {
        self.env = env;
        self
    }
}
