/*!
 * Single-Connection Listener
 * Presents one already-connected duplex stream as a listener
 *
 * The first accept hands out the stream. Every later accept parks on a
 * one-slot close signal and resolves to end-of-stream once the listener
 * is closed.
 */

use super::connection::{BridgeAddr, BridgedConnection};
use futures::Stream;
use parking_lot::Mutex;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Generic listener capability
pub trait ConnectionListener: Send + Sync {
    type Conn;

    /// Next connection, or `None` once the listener is closed
    fn accept(&self) -> Pin<Box<dyn Future<Output = Option<Self::Conn>> + Send + '_>>;

    /// Stop accepting. Safe to call more than once.
    fn close(&self);

    /// Opaque local address marker
    fn local_addr(&self) -> BridgeAddr;
}

/// Listener over exactly one pre-connected stream
pub struct SingleConnListener<S> {
    slot: Mutex<Option<S>>,
    closed: watch::Sender<bool>,
}

impl<S> SingleConnListener<S> {
    pub fn new(stream: S) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            slot: Mutex::new(Some(stream)),
            closed,
        }
    }

    /// Hand out the wrapped stream once; afterwards block until closed
    pub async fn accept(&self) -> Option<BridgedConnection<S>> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return None;
        }

        if let Some(stream) = self.slot.lock().take() {
            debug!("Accepted bridged connection");
            return Some(BridgedConnection::new(stream, BridgeAddr));
        }

        // Sender lives in self, so this only errs if self is gone
        let _ = closed.wait_for(|closed| *closed).await;
        None
    }

    pub fn close(&self) {
        if !self.closed.send_replace(true) {
            debug!("Listener closed");
        }
        // Drop a never-accepted stream so the peer sees EOF
        self.slot.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub fn local_addr(&self) -> BridgeAddr {
        BridgeAddr
    }
}

impl<S: Send + 'static> SingleConnListener<S> {
    /// Connection stream for `serve_with_incoming`; ends when the listener closes
    pub fn incoming(
        self: Arc<Self>,
    ) -> impl Stream<Item = io::Result<BridgedConnection<S>>> + Send + 'static {
        async_stream::stream! {
            while let Some(conn) = self.accept().await {
                yield Ok(conn);
            }
        }
    }
}

impl<S: Send> ConnectionListener for SingleConnListener<S> {
    type Conn = BridgedConnection<S>;

    fn accept(&self) -> Pin<Box<dyn Future<Output = Option<Self::Conn>> + Send + '_>> {
        Box::pin(SingleConnListener::accept(self))
    }

    fn close(&self) {
        SingleConnListener::close(self)
    }

    fn local_addr(&self) -> BridgeAddr {
        SingleConnListener::local_addr(self)
    }
}
