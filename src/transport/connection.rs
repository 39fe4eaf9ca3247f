/*!
 * Bridged Connection
 * Duplex stream wrapper that tonic can serve on
 */

use std::fmt;
use std::io::{self, IoSlice};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tonic::transport::server::Connected;

/// Address of a connection that has no socket address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BridgeAddr;

impl BridgeAddr {
    pub const fn network(&self) -> &'static str {
        "socketpair"
    }
}

impl fmt::Display for BridgeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.network())
    }
}

/// Per-connection info exposed to handlers through request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConnectInfo {
    pub local_addr: BridgeAddr,
}

/// Stream handed out by a [`SingleConnListener`](super::SingleConnListener)
#[derive(Debug)]
pub struct BridgedConnection<S> {
    inner: S,
    local_addr: BridgeAddr,
}

impl<S> BridgedConnection<S> {
    pub fn new(inner: S, local_addr: BridgeAddr) -> Self {
        Self { inner, local_addr }
    }

    pub fn local_addr(&self) -> BridgeAddr {
        self.local_addr
    }
}

impl<S> Connected for BridgedConnection<S> {
    type ConnectInfo = BridgeConnectInfo;

    fn connect_info(&self) -> Self::ConnectInfo {
        BridgeConnectInfo {
            local_addr: self.local_addr,
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for BridgedConnection<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for BridgedConnection<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
