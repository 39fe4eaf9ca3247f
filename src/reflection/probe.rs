/*!
 * Reflection Probe
 * Stands up a private server on a socketpair and asks it, through
 * reflection, which services it registers
 */

use crate::api::server::{build_router, ServerHandle};
use crate::api::types::GatewayConfig;
use crate::process::HostEnvironment;
use crate::transport::{channel_over, socket_pair, SingleConnListener, TransportError};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tonic::transport::Channel;
use tonic_reflection::pb::server_reflection_client::ServerReflectionClient;
use tonic_reflection::pb::server_reflection_request::MessageRequest;
use tonic_reflection::pb::server_reflection_response::MessageResponse;
use tonic_reflection::pb::ServerReflectionRequest;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to build reflection service: {0}")]
    Reflection(#[from] tonic_reflection::server::Error),

    #[error("reflection call failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("reflection error: {0}")]
    Remote(String),

    #[error("reflection stream ended without a service list")]
    NoResponse,

    #[error("reflection probe timed out")]
    Timeout,

    #[error("failed to write service list: {0}")]
    Output(#[from] std::io::Error),
}

/// Ask a reflection-enabled server for its service names, sorted
pub async fn query_services(channel: Channel) -> Result<Vec<String>, ProbeError> {
    let mut client = ServerReflectionClient::new(channel);
    let request = ServerReflectionRequest {
        host: String::new(),
        message_request: Some(MessageRequest::ListServices(String::new())),
    };

    let mut responses = client
        .server_reflection_info(tokio_stream::iter(vec![request]))
        .await?
        .into_inner();

    while let Some(response) = responses.message().await? {
        match response.message_response {
            Some(MessageResponse::ListServicesResponse(list)) => {
                let mut names: Vec<String> = list.service.into_iter().map(|s| s.name).collect();
                names.sort();
                return Ok(names);
            }
            Some(MessageResponse::ErrorResponse(err)) => {
                return Err(ProbeError::Remote(err.error_message));
            }
            _ => continue,
        }
    }
    Err(ProbeError::NoResponse)
}

async fn query_over(client_end: tokio::net::UnixStream) -> Result<Vec<String>, ProbeError> {
    let channel = channel_over(client_end).await?;
    query_services(channel).await
}

/// Services the gateway registers, discovered by calling itself
pub async fn list_services(
    config: &GatewayConfig,
    host: Arc<dyn HostEnvironment>,
) -> Result<Vec<String>, ProbeError> {
    let (server_end, client_end) = socket_pair()?;
    let router = build_router(config, host)?;
    let server = ServerHandle::spawn(router, Arc::new(SingleConnListener::new(server_end)));

    let result = tokio::time::timeout(PROBE_TIMEOUT, query_over(client_end))
        .await
        .unwrap_or(Err(ProbeError::Timeout));

    server.abort();
    debug!(ok = result.is_ok(), "Reflection probe finished");
    result
}

/// One name per line
pub fn write_services<W: Write>(names: &[String], out: &mut W) -> Result<(), ProbeError> {
    for name in names {
        writeln!(out, "{}", name)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_services_one_per_line() {
        let mut out = Vec::new();
        write_services(&["a.A".to_string(), "b.B".to_string()], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a.A\nb.B\n");
    }
}
