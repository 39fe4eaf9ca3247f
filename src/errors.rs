/*!
 * Error Types
 * Fatal startup errors with miette diagnostics
 */

use crate::process::LoaderError;
use crate::reflection::ProbeError;
use crate::transport::TransportError;
use miette::Diagnostic;
use thiserror::Error;

/// Crate-level error for the startup path
#[derive(Error, Debug, Diagnostic)]
pub enum GatewayError {
    #[error("Failed to exec: {0}")]
    #[diagnostic(
        code(gateway::exec_failed),
        help("Check that the program exists on PATH and is executable.")
    )]
    Exec(#[from] LoaderError),

    #[error("Transport error: {0}")]
    #[diagnostic(
        code(gateway::transport),
        help("The stdio bridge could not be set up; there is no degraded mode for a broken transport.")
    )]
    Transport(#[from] TransportError),

    #[error("Failed to register services: {0}")]
    #[diagnostic(code(gateway::services))]
    Services(#[from] tonic_reflection::server::Error),

    #[error("Failed to list services: {0}")]
    #[diagnostic(code(gateway::probe))]
    Probe(#[from] ProbeError),

    #[error("Failed to start async runtime: {0}")]
    #[diagnostic(code(gateway::runtime))]
    Runtime(#[source] std::io::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
