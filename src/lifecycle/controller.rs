/*!
 * Lifecycle Controller
 * Runs whichever mode the startup facts select
 */

use super::mode::{decide, decide_after_peek, LifecycleState, StartupDecision, StartupFacts};
use crate::api::server::{build_router, ServerHandle};
use crate::api::types::GatewayConfig;
use crate::errors::{GatewayError, GatewayResult};
use crate::process::{ExecRequest, HostEnvironment, ProcessLoader};
use crate::reflection::{list_services, write_services};
use crate::transport::{socket_pair, SingleConnListener, StdioBridge};
use std::convert::Infallible;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(250);

/// Drives the process from startup to exit
#[derive(Clone)]
pub struct LifecycleController {
    config: GatewayConfig,
    host: Arc<dyn HostEnvironment>,
}

impl LifecycleController {
    pub fn new(config: GatewayConfig, host: Arc<dyn HostEnvironment>) -> Self {
        Self { config, host }
    }

    /// Run to completion on the real stdio.
    ///
    /// The exec path never starts a runtime, so the new image inherits a
    /// single-threaded process. Returns the terminal state on success.
    pub fn run(&self, facts: StartupFacts) -> GatewayResult<LifecycleState> {
        let decision = decide(&facts);
        debug!(state = decision.state().as_str(), pid = facts.pid, "Startup decision");

        match decision {
            StartupDecision::Exec(request) => match self.exec(request)? {},
            StartupDecision::Probe => {
                self.block_on(self.probe(&mut std::io::stdout()))?;
                Ok(LifecycleState::InteractiveProbe)
            }
            StartupDecision::Bridge => {
                let is_init = facts.pid == self.config.init_pid;
                self.block_on(self.serve_stdio(is_init))
            }
        }
    }

    /// Replace this process with the requested command
    pub fn exec(&self, request: ExecRequest) -> GatewayResult<Infallible> {
        let loader = ProcessLoader::new(self.host.clone());
        Ok(loader.exec(&request)?)
    }

    /// List the registered services on `out`
    pub async fn probe<W: Write>(&self, out: &mut W) -> GatewayResult<()> {
        let names = list_services(&self.config, self.host.clone()).await?;
        write_services(&names, out)?;
        Ok(())
    }

    async fn serve_stdio(&self, is_init: bool) -> GatewayResult<LifecycleState> {
        let state = self
            .run_bridge(tokio::io::stdin(), tokio::io::stdout(), is_init)
            .await?;
        if state == LifecycleState::InteractiveProbe {
            self.probe(&mut std::io::stdout()).await?;
        }
        Ok(state)
    }

    /// Serve gRPC over `input`/`output` until the mode's exit condition.
    ///
    /// Returns `InteractiveProbe` without listing anything when the first
    /// read was empty; the caller decides where the listing goes.
    pub async fn run_bridge<R, W>(
        &self,
        input: R,
        output: W,
        is_init: bool,
    ) -> GatewayResult<LifecycleState>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (server_end, client_end) = socket_pair()?;
        let router = build_router(&self.config, self.host.clone())?;
        let server = ServerHandle::spawn(router, Arc::new(SingleConnListener::new(server_end)));
        let mut bridge = StdioBridge::start(input, output, client_end);

        let had_data = bridge.first_read_had_data().await;
        let state = decide_after_peek(had_data, is_init);
        info!(state = state.as_str(), had_data, is_init, "Serving mode selected");

        match state {
            LifecycleState::InteractiveProbe => {
                bridge.abort();
                server.abort();
            }
            LifecycleState::ServerInit => {
                // Nothing closes the listener, so this only returns on error
                server.wait().await?;
                warn!("gRPC server exited while running as init");
            }
            _ => {
                let received = bridge.input_closed().await;
                info!(bytes = received, "stdin closed, shutting down");
                server.shutdown(self.config.shutdown_grace).await?;
                if tokio::time::timeout(self.config.shutdown_grace, bridge.output_closed())
                    .await
                    .is_err()
                {
                    warn!("stdout bridge did not drain in time");
                    bridge.abort();
                }
            }
        }
        Ok(state)
    }

    fn block_on<F, T>(&self, future: F) -> GatewayResult<T>
    where
        F: std::future::Future<Output = GatewayResult<T>>,
    {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(GatewayError::Runtime)?;
        let result = runtime.block_on(future);
        // A blocked stdin reader thread must not hold up exit
        runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
        if let Err(e) = &result {
            error!(error = %e, "Gateway failed");
        }
        result
    }
}
