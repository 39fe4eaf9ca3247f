/*!
 * Runner gRPC handler
 * Fork/spawn/stop are advertised but not implemented yet
 */

use crate::api::server::grpc_server::runner_proto::runner_server::Runner;
use crate::api::server::grpc_server::runner_proto::{
    ForkRequest, Process, SpawnRequest, StopRequest, StopResponse,
};
use tonic::{Request, Response, Status};

#[derive(Debug, Default)]
pub struct RunnerService;

impl RunnerService {
    pub fn new() -> Self {
        Self
    }
}

#[tonic::async_trait]
impl Runner for RunnerService {
    async fn fork(&self, _request: Request<ForkRequest>) -> Result<Response<Process>, Status> {
        Err(Status::unimplemented("Fork not yet implemented"))
    }

    async fn spawn(&self, _request: Request<SpawnRequest>) -> Result<Response<Process>, Status> {
        Err(Status::unimplemented("Spawn not yet implemented"))
    }

    async fn stop(&self, _request: Request<StopRequest>) -> Result<Response<StopResponse>, Status> {
        Err(Status::unimplemented("Stop not yet implemented"))
    }
}
