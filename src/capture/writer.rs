// src/capture/writer.rs

//! Input writer: feeds the run's input payload into the child's stdin.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::debug;

/// Upper bound on the bytes written per scheduling step.
pub const WRITE_CHUNK_SIZE: usize = 0x4000;

/// The part of the input buffer not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingWrite {
    buffer: Vec<u8>,
    cursor: usize,
}

impl PendingWrite {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            buffer: text.as_bytes().to_vec(),
            cursor: 0,
        }
    }

    pub(crate) fn next_chunk(&self) -> &[u8] {
        let end = (self.cursor + WRITE_CHUNK_SIZE).min(self.buffer.len());
        &self.buffer[self.cursor..end]
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.cursor = (self.cursor + n).min(self.buffer.len());
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

/// What the writer managed to do before stdin was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    pub written: usize,
    /// False if a write error cut the payload short.
    pub completed: bool,
}

/// Write `pending` into `sink` one chunk per step, yielding between steps,
/// then close the sink.
///
/// Write errors (typically a broken pipe because the child stopped reading)
/// end the writer early. They are not propagated.
pub(crate) async fn feed_input<W>(mut sink: W, mut pending: PendingWrite) -> WriteReport
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    let mut completed = true;

    while !pending.is_empty() {
        let chunk = pending.next_chunk();
        let len = chunk.len();

        if let Err(e) = sink.write_all(chunk).await {
            debug!(error = %e, written, remaining = pending.remaining(), "stdin write failed; closing");
            completed = false;
            break;
        }

        pending.advance(len);
        written += len;
        tokio::task::yield_now().await;
    }

    let _ = sink.shutdown().await;
    drop(sink);

    WriteReport { written, completed }
}

/// Spawn the writer task for a child's stdin.
///
/// Aborting the returned handle drops the stdin handle, which closes it.
pub(crate) fn spawn_writer<W>(sink: W, pending: PendingWrite) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let total = pending.remaining();
        let report = feed_input(sink, pending).await;
        debug!(
            total,
            written = report.written,
            completed = report.completed,
            "stdin closed"
        );
    })
}
