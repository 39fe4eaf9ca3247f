/*!
 * runrpc - Main Entry Point
 *
 * Small gateway that exposes process control over gRPC on its own stdio:
 * - With arguments: becomes that command
 * - On a terminal: lists its services
 * - On a pipe: serves until stdin closes (forever as PID 1)
 */

use miette::Report;
use runrpc::{init_tracing, GatewayConfig, LifecycleController, StartupFacts, SystemEnvironment};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

fn main() -> ExitCode {
    // Initialize structured tracing (stderr only)
    init_tracing();

    let facts = StartupFacts::capture();
    let config = GatewayConfig::from_env();
    let controller = LifecycleController::new(config, Arc::new(SystemEnvironment));

    match controller.run(facts) {
        Ok(state) => {
            info!(state = state.as_str(), "runrpc exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{:?}", Report::new(e));
            ExitCode::FAILURE
        }
    }
}
