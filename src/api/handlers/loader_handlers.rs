/*!
 * Loader gRPC handler
 * Process image replacement; linking and loading are reserved
 */

use crate::api::server::grpc_server::loader_proto::loader_server::Loader;
use crate::api::server::grpc_server::loader_proto::{
    BytesValue, ExecutionArgs, ExitCode, LoadArgs, LoadHandle,
};
use crate::monitoring::span_grpc;
use crate::process::{ExecRequest, HostEnvironment, ProcessLoader};
use std::sync::Arc;
use tonic::{Request, Response, Status, Streaming};

pub struct LoaderService {
    loader: ProcessLoader,
}

impl LoaderService {
    pub fn new(host: Arc<dyn HostEnvironment>) -> Self {
        Self {
            loader: ProcessLoader::new(host),
        }
    }
}

#[tonic::async_trait]
impl Loader for LoaderService {
    async fn exec(&self, request: Request<ExecutionArgs>) -> Result<Response<ExitCode>, Status> {
        let span = span_grpc("loader.Loader/Exec");
        let request = ExecRequest::from(request.into_inner());

        // Only an error can come back from here
        match span.span().in_scope(|| self.loader.exec(&request)) {
            Ok(never) => match never {},
            Err(e) => {
                span.record_error(&e.to_string());
                Err(e.into())
            }
        }
    }

    async fn link(
        &self,
        _request: Request<Streaming<BytesValue>>,
    ) -> Result<Response<LoadHandle>, Status> {
        Err(Status::unimplemented("Link not yet implemented"))
    }

    async fn load(&self, _request: Request<LoadArgs>) -> Result<Response<ExitCode>, Status> {
        Err(Status::unimplemented("Load not yet implemented"))
    }
}
