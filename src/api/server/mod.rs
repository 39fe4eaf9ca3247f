/*!
 * Server Module
 * gRPC service registration and bridged serving
 */

pub mod grpc_server;

pub use grpc_server::{
    build_router, commander_proto, loader_proto, runner_proto, ServerHandle, FILE_DESCRIPTOR_SET,
};
