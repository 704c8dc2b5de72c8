//! Per-connection lifecycle.
//!
//! Each accepted transport gets:
//! - a name handshake (the first line identifies the peer),
//! - a registration with the hub (which assigns the identity),
//! - a writer task draining the bounded outbound queue,
//! - a reader loop forwarding inbound lines to the hub.
//!
//! Teardown converges on one idempotent path no matter which side fires
//! first: reader end-of-stream, reader error, write error, or the hub
//! evicting us. The reader and writer never touch the registry; they only
//! ever talk to the hub through its handle.
//!
//! The transport is any `AsyncRead + AsyncWrite` stream, so tests can
//! drive connections over in-memory pipes exactly like TCP.

use std::io;

use anyhow::Result;
use bytes::BytesMut;
use relay_core::ConnId;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, WriteHalf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::hub::HubHandle;
use crate::types::OutboundRx;

/// Run one connection to completion.
///
/// `queue_capacity` bounds the outbound queue; the hub evicts us if we
/// let it fill up.
pub async fn run_connection<S>(stream: S, hub: HubHandle, queue_capacity: usize) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut lines = LineReader::new(read_half);

    // Handshake: the first line is the display name. A peer that hangs up
    // before identifying itself was never registered at all.
    let name = match lines.next_line().await? {
        None => return Ok(()),
        Some(line) => {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
    };

    let (out_tx, out_rx) = mpsc::channel(queue_capacity);
    let id = hub.register(name, out_tx).await?;
    debug!(conn = %id, "connection attached");

    let mut writer = tokio::spawn(write_loop(id, write_half, out_rx));

    tokio::select! {
        res = read_loop(id, &mut lines, &hub) => {
            // Reader finished (end-of-stream or transport error). Retire
            // the peer; the hub drops our queue sender, which lets the
            // writer drain what is left and exit.
            let _ = hub.unregister(id);
            let _ = writer.await;
            res
        }
        _ = &mut writer => {
            // Writer stopped first: either the hub evicted us (queue
            // closed) or the transport rejected a write. The reader is
            // torn down with this task.
            let _ = hub.unregister(id);
            Ok(())
        }
    }
}

/// Reader loop: forward every complete inbound line to the hub.
async fn read_loop<R>(id: ConnId, lines: &mut LineReader<R>, hub: &HubHandle) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.is_empty() {
                    continue;
                }
                debug!(conn = %id, line = %line, "inbound line");
                hub.dispatch(id, line)?;
            }
            Ok(None) => {
                debug!(conn = %id, "end of stream");
                return Ok(());
            }
            Err(e) => {
                warn!(conn = %id, error = %e, "read failed");
                return Ok(());
            }
        }
    }
}

/// Writer task: drain the outbound queue onto the transport.
///
/// Exits when the queue is closed and drained (the hub retired us) or on
/// the first write error, then finishes the stream so the peer observes a
/// clean end-of-stream.
async fn write_loop<S>(id: ConnId, mut transport: WriteHalf<S>, mut queue: OutboundRx)
where
    S: AsyncWrite,
{
    while let Some(text) = queue.recv().await {
        let data = format!("{}\n", text);
        if let Err(e) = write_all_flush(&mut transport, data.as_bytes()).await {
            warn!(conn = %id, error = %e, "write failed, dropping connection");
            break;
        }
        debug!(conn = %id, line = %text, "outbound line");
    }

    let _ = transport.shutdown().await;
}

async fn write_all_flush<S: AsyncWrite>(
    transport: &mut WriteHalf<S>,
    data: &[u8],
) -> io::Result<()> {
    transport.write_all(data).await?;
    transport.flush().await
}

/// Incremental newline framing over a raw byte stream.
///
/// Lines come back without their terminator; a trailing chunk with no
/// newline at end-of-stream still counts as a final line.
struct LineReader<R> {
    inner: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    fn new(inner: R) -> Self {
        LineReader {
            inner,
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Next complete line, or `None` on clean end-of-stream.
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line = self.buffer.split_to(pos + 1);
                return Ok(Some(decode_line(&line)));
            }

            let n = self.inner.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let line = self.buffer.split();
                return Ok(Some(decode_line(&line)));
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.trim_end_matches(|c| c == '\r' || c == '\n').to_string()
}
