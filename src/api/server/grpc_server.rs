/*!
 * gRPC Server
 * Service registration and serving over a bridged single connection
 */

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::transport::server::Router;
use tonic::transport::Server;
use tracing::{info, warn};

use crate::api::handlers::{CommanderService, LoaderService, RunnerService};
use crate::api::types::GatewayConfig;
use crate::process::HostEnvironment;
use crate::transport::{SingleConnListener, TransportError};

// Include generated protobuf code
pub mod commander_proto {
    tonic::include_proto!("commander");
}

pub mod loader_proto {
    tonic::include_proto!("loader");
}

pub mod runner_proto {
    tonic::include_proto!("runner");
}

/// Encoded descriptors for every service above
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("runrpc_descriptor");

use commander_proto::commander_server::CommanderServer;
use loader_proto::loader_server::LoaderServer;
use runner_proto::runner_server::RunnerServer;

/// Register commander, loader, runner and reflection
pub fn build_router(
    config: &GatewayConfig,
    host: Arc<dyn HostEnvironment>,
) -> Result<Router, tonic_reflection::server::Error> {
    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build()?;

    Ok(Server::builder()
        .add_service(CommanderServer::new(CommanderService::new(config, host.clone())))
        .add_service(LoaderServer::new(LoaderService::new(host)))
        .add_service(RunnerServer::new(RunnerService::new()))
        .add_service(reflection))
}

/// A router serving on a [`SingleConnListener`] in a background task
pub struct ServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), TransportError>>,
}

impl ServerHandle {
    pub fn spawn<S>(router: Router, listener: Arc<SingleConnListener<S>>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let incoming = listener.clone().incoming();
        let signal = async move {
            let _ = shutdown_rx.await;
            listener.close();
        };

        info!(addr = %crate::transport::BridgeAddr, "gRPC server starting");
        let task = tokio::spawn(async move {
            router
                .serve_with_incoming_shutdown(incoming, signal)
                .await
                .map_err(TransportError::Serve)
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Reject new calls, give in-flight ones `grace`, then stop
    pub async fn shutdown(mut self, grace: Duration) -> Result<(), TransportError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        match tokio::time::timeout(grace, &mut self.task).await {
            Ok(joined) => {
                info!("gRPC server stopped");
                flatten(joined)
            }
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "Shutdown grace elapsed, aborting in-flight calls");
                self.task.abort();
                Ok(())
            }
        }
    }

    /// Drop the server without waiting for anything
    pub fn abort(self) {
        self.task.abort();
    }

    /// Serve until the server stops on its own
    pub async fn wait(self) -> Result<(), TransportError> {
        let ServerHandle { shutdown_tx, task } = self;
        // Keep the sender alive: dropping it would trigger shutdown
        let _shutdown_tx = shutdown_tx;
        flatten(task.await)
    }
}

fn flatten(
    joined: Result<Result<(), TransportError>, tokio::task::JoinError>,
) -> Result<(), TransportError> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(TransportError::Task(e.to_string())),
    }
}
