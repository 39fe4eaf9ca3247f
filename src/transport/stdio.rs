/*!
 * Stdio Bridge
 * Copies bytes between the process's stdin/stdout and one end of a
 * connected pair, in two independent tasks
 *
 * The inbound task reports whether its first read carried any data, so the
 * caller can tell "a controller is speaking" from "stdin is already closed".
 */

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const BRIDGE_BUFFER_SIZE: usize = 4096;

/// Running stdio bridge
pub struct StdioBridge {
    first_read: Option<oneshot::Receiver<bool>>,
    inbound: JoinHandle<u64>,
    outbound: JoinHandle<u64>,
}

impl StdioBridge {
    /// Start copying `input` into `stream` and `stream` into `output`.
    ///
    /// Takes ownership of all three; each is closed when its copy ends.
    pub fn start<R, W, S>(input: R, output: W, stream: S) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (stream_read, stream_write) = tokio::io::split(stream);
        let (first_tx, first_rx) = oneshot::channel();

        let inbound = tokio::spawn(copy_inbound(input, stream_write, first_tx));
        let outbound = tokio::spawn(copy_outbound(stream_read, output));

        Self {
            first_read: Some(first_rx),
            inbound,
            outbound,
        }
    }

    /// Whether the first read from input returned any bytes.
    /// A read error or a dropped task counts as no data.
    pub async fn first_read_had_data(&mut self) -> bool {
        match self.first_read.take() {
            Some(rx) => rx.await.unwrap_or(false),
            None => false,
        }
    }

    /// Resolves once input reached end-of-stream (or failed)
    pub async fn input_closed(&mut self) -> u64 {
        match (&mut self.inbound).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "stdin bridge task failed");
                0
            }
        }
    }

    /// Stop both copy directions
    pub fn abort(&self) {
        self.inbound.abort();
        self.outbound.abort();
    }

    /// Resolves once the stream side closed and stdout is flushed.
    /// Like [`input_closed`](Self::input_closed), await it at most once.
    pub async fn output_closed(&mut self) -> u64 {
        match (&mut self.outbound).await {
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "stdout bridge task ended early");
                0
            }
        }
    }
}

async fn copy_inbound<R, W>(mut input: R, mut stream: W, first_tx: oneshot::Sender<bool>) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BRIDGE_BUFFER_SIZE];

    let first = match input.read(&mut buf).await {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "stdin error");
            0
        }
    };
    let _ = first_tx.send(first > 0);

    let mut total = 0u64;
    if first > 0 {
        total = first as u64;
        match stream.write_all(&buf[..first]).await {
            Ok(()) => match tokio::io::copy(&mut input, &mut stream).await {
                Ok(n) => total += n,
                Err(e) => warn!(error = %e, "stdin error"),
            },
            Err(e) => warn!(error = %e, "bridge write failed"),
        }
    }

    // Half-close so the server side sees EOF
    if let Err(e) = stream.shutdown().await {
        debug!(error = %e, "bridge shutdown failed");
    }
    debug!(bytes = total, "stdin closed");
    total
}

async fn copy_outbound<R, W>(mut stream: R, mut output: W) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BRIDGE_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "bridge read failed");
                break;
            }
        };
        // Flush per chunk: stdout is line buffered and frames are binary
        let written = async {
            output.write_all(&buf[..n]).await?;
            output.flush().await
        };
        if let Err(e) = written.await {
            warn!(error = %e, "stdout error");
            break;
        }
        total += n as u64;
    }

    let _ = output.shutdown().await;
    debug!(bytes = total, "stdout bridge finished");
    total
}
