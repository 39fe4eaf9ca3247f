/*!
 * Loopback Client
 * Builds a gRPC channel over an already-connected duplex stream
 */

use super::TransportError;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

/// Authority is never resolved; the connector ignores it
const BRIDGE_URI: &str = "http://socketpair.local";

/// Connect a channel that speaks over `stream`.
///
/// The stream can only be used once, so a reconnect attempt fails with
/// `NotConnected` instead of dialing anything.
pub async fn channel_over<S>(stream: S) -> Result<Channel, TransportError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let slot = Arc::new(Mutex::new(Some(stream)));

    Endpoint::from_static(BRIDGE_URI)
        .connect_with_connector(service_fn(move |_: Uri| {
            let stream = slot.lock().take();
            async move {
                stream.ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotConnected, "bridged stream already used")
                })
            }
        }))
        .await
        .map_err(TransportError::Connect)
}
