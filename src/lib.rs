/*!
 * runrpc Library
 * gRPC process-control gateway served over stdio
 */

pub mod api;
pub mod errors;
pub mod lifecycle;
pub mod monitoring;
pub mod process;
pub mod reflection;
pub mod transport;

// Re-exports
pub use api::{build_router, GatewayConfig, ServerHandle};
pub use errors::{GatewayError, GatewayResult};
pub use lifecycle::{LifecycleController, LifecycleState, StartupFacts};
pub use monitoring::init_tracing;
pub use process::{CommandStreamer, HostEnvironment, ProcessLoader, SystemEnvironment};
pub use reflection::list_services;
pub use transport::{channel_over, socket_pair, SingleConnListener, StdioBridge};
