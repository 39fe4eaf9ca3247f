/*!
 * Transport Module
 * Serving gRPC over byte streams that are not sockets
 */

pub mod client;
pub mod connection;
pub mod listener;
pub mod pipe;
pub mod stdio;

use thiserror::Error;

pub use client::channel_over;
pub use connection::{BridgeAddr, BridgeConnectInfo, BridgedConnection};
pub use listener::{ConnectionListener, SingleConnListener};
pub use pipe::PipePair;
pub use stdio::StdioBridge;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to create socketpair: {0}")]
    SocketPair(#[source] std::io::Error),

    #[error("failed to connect bridged channel: {0}")]
    Connect(#[source] tonic::transport::Error),

    #[error("server error: {0}")]
    Serve(#[source] tonic::transport::Error),

    #[error("server task failed: {0}")]
    Task(String),
}

/// Kernel-level connected pair: server end, client end
pub fn socket_pair() -> Result<(tokio::net::UnixStream, tokio::net::UnixStream), TransportError> {
    tokio::net::UnixStream::pair().map_err(TransportError::SocketPair)
}
