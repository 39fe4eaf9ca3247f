/*!
 * Handler implementations for gRPC service methods
 */

pub mod commander_handlers;
pub mod loader_handlers;
pub mod runner_handlers;

pub use commander_handlers::{CommanderService, GrpcOutputSink};
pub use loader_handlers::LoaderService;
pub use runner_handlers::RunnerService;
