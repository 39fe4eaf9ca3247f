/*!
 * Commander gRPC handler
 * Streaming shell execution
 */

use crate::api::conversions::output_to_proto;
use crate::api::server::grpc_server::commander_proto::commander_server::Commander;
use crate::api::server::grpc_server::commander_proto::{Command, Output};
use crate::api::types::GatewayConfig;
use crate::monitoring::span_grpc;
use crate::process::{CommandStreamer, HostEnvironment, OutputChunk, OutputSink, ShellRequest};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{info, warn, Instrument};

/// Forwards chunks into a gRPC response stream
#[derive(Clone)]
pub struct GrpcOutputSink {
    tx: mpsc::Sender<Result<Output, Status>>,
}

impl OutputSink for GrpcOutputSink {
    type Error = mpsc::error::SendError<Result<Output, Status>>;

    async fn send(&self, chunk: OutputChunk) -> Result<(), Self::Error> {
        self.tx.send(Ok(output_to_proto(chunk))).await
    }
}

pub struct CommanderService {
    streamer: CommandStreamer,
    output_buffer: usize,
}

impl CommanderService {
    pub fn new(config: &GatewayConfig, host: Arc<dyn HostEnvironment>) -> Self {
        let streamer = CommandStreamer::new(host)
            .with_default_shell(config.default_shell.clone())
            .with_chunk_size(config.chunk_size);
        Self {
            streamer,
            output_buffer: config.output_buffer,
        }
    }
}

#[tonic::async_trait]
impl Commander for CommanderService {
    type ShellStream = ReceiverStream<Result<Output, Status>>;

    async fn shell(&self, request: Request<Command>) -> Result<Response<Self::ShellStream>, Status> {
        let span = span_grpc("commander.Commander/Shell");
        let request = ShellRequest::from(request.into_inner());

        // Validation and spawn failures surface as the call status
        let running = match span.span().in_scope(|| self.streamer.start(&request)) {
            Ok(running) => running,
            Err(e) => {
                span.record_error(&e.to_string());
                return Err(e.into());
            }
        };

        let (tx, rx) = mpsc::channel(self.output_buffer);
        let sink = GrpcOutputSink { tx: tx.clone() };
        let task_span = span.span().clone();

        tokio::spawn(
            async move {
                match running.stream_to(sink).await {
                    Ok(()) => {
                        span.record_status("ok");
                        info!("Shell command succeeded");
                    }
                    Err(e) => {
                        span.record_error(&e.to_string());
                        warn!(error = %e, "Shell command failed");
                        // Receiver may already be gone
                        let _ = tx.send(Err(e.into())).await;
                    }
                }
            }
            .instrument(task_span),
        );

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
