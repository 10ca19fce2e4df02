// src/capture/reader.rs

//! Stream readers: one per captured output stream.
//!
//! A reader pulls whatever bytes are available, frames them into complete
//! lines with a [`LineFramer`] and forwards each line to the run's
//! coordinator. Lines and the final `Closed` notice travel over the same
//! channel, so the coordinator always sees a stream's lines before its
//! closure.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::types::StreamKind;

/// Size of a single read from a captured stream.
pub const READ_BUFFER_SIZE: usize = 8192;

/// Message from a reader task to the run coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StreamMessage {
    Line(StreamKind, String),
    Closed(StreamKind),
}

/// UTF-8 encoding of U+2029 PARAGRAPH SEPARATOR.
const PARAGRAPH_SEPARATOR: &[u8] = "\u{2029}".as_bytes();

/// Splits a byte stream into lines.
///
/// Recognised terminators: `\n`, `\r\n`, a lone `\r`, `\0` and U+2029. A
/// `\r` (or a partial U+2029) at the end of the buffered bytes is held until
/// the next byte shows which terminator it starts. Bytes after the last
/// terminator are kept until more data arrives. Lines are decoded as UTF-8,
/// replacing invalid sequences.
#[derive(Debug, Default)]
pub struct LineFramer {
    residual: Vec<u8>,
    // Prefix of `residual` known to hold no terminator.
    scanned: usize,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed freshly read bytes, returning every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.residual.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut pos = self.scanned;

        while pos < self.residual.len() {
            let rest = &self.residual[pos..];
            let terminator_len = match rest[0] {
                b'\n' | b'\0' => 1,
                b'\r' => match rest.get(1) {
                    Some(b'\n') => 2,
                    Some(_) => 1,
                    None => break,
                },
                first if first == PARAGRAPH_SEPARATOR[0] => {
                    if rest.len() < PARAGRAPH_SEPARATOR.len() {
                        if PARAGRAPH_SEPARATOR.starts_with(rest) {
                            break;
                        }
                        0
                    } else if rest.starts_with(PARAGRAPH_SEPARATOR) {
                        PARAGRAPH_SEPARATOR.len()
                    } else {
                        0
                    }
                }
                _ => 0,
            };

            if terminator_len == 0 {
                pos += 1;
                continue;
            }

            lines.push(decode_line(&self.residual[start..pos]));
            pos += terminator_len;
            start = pos;
        }

        self.residual.drain(..start);
        self.scanned = pos - start;
        lines
    }

    /// Bytes buffered after the last complete terminator, including a held
    /// `\r`.
    pub fn residual(&self) -> &[u8] {
        &self.residual
    }

    /// Signal end of input. A held trailing `\r` terminates its line, which
    /// is returned; an unterminated fragment stays buffered for [`finish`].
    ///
    /// [`finish`]: LineFramer::finish
    pub fn end_of_input(&mut self) -> Option<String> {
        if self.residual.last() != Some(&b'\r') {
            return None;
        }
        let line = decode_line(&self.residual[..self.residual.len() - 1]);
        self.clear();
        Some(line)
    }

    /// Take the unterminated trailing fragment, if any, as a line.
    pub fn finish(&mut self) -> Option<String> {
        if self.residual.is_empty() {
            return None;
        }
        let line = decode_line(&self.residual);
        self.clear();
        Some(line)
    }

    fn clear(&mut self) {
        self.residual.clear();
        self.scanned = 0;
    }
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Read `source` until end-of-stream, forwarding framed lines.
///
/// A read error ends the stream exactly like EOF does; nothing distinct is
/// reported. With `flush_partial`, a trailing fragment still buffered at the
/// end is forwarded as a last line, otherwise it is dropped.
pub(crate) async fn pump_lines<R>(
    mut source: R,
    kind: StreamKind,
    flush_partial: bool,
    tx: mpsc::Sender<StreamMessage>,
) where
    R: AsyncRead + Unpin,
{
    let mut framer = LineFramer::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match source.read(&mut buf).await {
            Ok(0) => {
                debug!(stream = %kind, "end of stream");
                break;
            }
            Ok(n) => {
                trace!(stream = %kind, bytes = n, "read from stream");
                for line in framer.push(&buf[..n]) {
                    if tx.send(StreamMessage::Line(kind, line)).await.is_err() {
                        debug!(stream = %kind, "coordinator gone; reader exiting");
                        return;
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(stream = %kind, error = %e, "read error; closing stream");
                break;
            }
        }
    }

    if let Some(line) = framer.end_of_input() {
        let _ = tx.send(StreamMessage::Line(kind, line)).await;
    }

    if flush_partial {
        if let Some(line) = framer.finish() {
            let _ = tx.send(StreamMessage::Line(kind, line)).await;
        }
    } else if !framer.residual().is_empty() {
        debug!(
            stream = %kind,
            bytes = framer.residual().len(),
            "dropping unterminated trailing fragment"
        );
    }

    let _ = tx.send(StreamMessage::Closed(kind)).await;
}

/// Spawn a reader task for one captured stream.
pub(crate) fn spawn_reader<R>(
    source: R,
    kind: StreamKind,
    flush_partial: bool,
    tx: mpsc::Sender<StreamMessage>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(pump_lines(source, kind, flush_partial, tx))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::ReadBuf;

    use super::*;

    /// Yields the queued chunks, then fails every read.
    struct FailingSource {
        chunks: VecDeque<Vec<u8>>,
    }

    impl FailingSource {
        fn new(chunks: &[&str]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            }
        }
    }

    impl AsyncRead for FailingSource {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    buf.put_slice(&chunk);
                    Poll::Ready(Ok(()))
                }
                None => Poll::Ready(Err(io::Error::other("device went away"))),
            }
        }
    }

    async fn drain(mut rx: mpsc::Receiver<StreamMessage>) -> Vec<StreamMessage> {
        let mut out = Vec::new();
        while let Some(msg) = rx.recv().await {
            out.push(msg);
        }
        out
    }

    fn line(text: &str) -> StreamMessage {
        StreamMessage::Line(StreamKind::Stdout, text.to_string())
    }

    #[test]
    fn framer_joins_lines_split_across_reads() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"hel").is_empty());
        assert_eq!(framer.push(b"lo\nwor"), vec!["hello"]);
        assert_eq!(framer.push(b"ld\n\nx"), vec!["world", ""]);
        assert_eq!(framer.residual(), b"x");
        assert_eq!(framer.finish().as_deref(), Some("x"));
        assert!(framer.finish().is_none());
    }

    #[test]
    fn framer_strips_crlf_and_replaces_bad_utf8() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.push(b"dos\r\n"), vec!["dos"]);
        assert_eq!(framer.push(b"a\xffb\n"), vec!["a\u{fffd}b"]);
    }

    #[test]
    fn framer_splits_progress_updates_and_other_terminators() {
        let mut framer = LineFramer::new();
        assert_eq!(
            framer.push(b"10%\r50%\r100%\r\ndone\0x\n"),
            vec!["10%", "50%", "100%", "done", "x"]
        );
        assert_eq!(
            framer.push("para\u{2029}next\n".as_bytes()),
            vec!["para", "next"]
        );
        assert!(framer.residual().is_empty());
    }

    #[test]
    fn framer_holds_carriage_return_until_next_byte() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"win\r").is_empty());
        assert_eq!(framer.residual(), b"win\r");
        assert_eq!(framer.push(b"\nmac\r"), vec!["win"]);
        assert_eq!(framer.push(b"tail"), vec!["mac"]);
        assert_eq!(framer.residual(), b"tail");
    }

    #[test]
    fn framer_handles_paragraph_separator_split_across_reads() {
        let sep = "\u{2029}".as_bytes();
        let mut framer = LineFramer::new();
        let mut first = b"left".to_vec();
        first.extend_from_slice(&sep[..2]);
        assert!(framer.push(&first).is_empty());

        let mut second = sep[2..].to_vec();
        second.extend_from_slice("right\u{2026}\n".as_bytes());
        assert_eq!(framer.push(&second), vec!["left", "right\u{2026}"]);
    }

    #[test]
    fn carriage_return_at_end_of_input_terminates_the_line() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"last\r").is_empty());
        assert_eq!(framer.end_of_input().as_deref(), Some("last"));
        assert!(framer.finish().is_none());

        assert!(framer.push(b"open").is_empty());
        assert!(framer.end_of_input().is_none());
        assert_eq!(framer.finish().as_deref(), Some("open"));
    }

    #[tokio::test]
    async fn trailing_carriage_return_is_delivered_without_flush_partial() {
        let (tx, rx) = mpsc::channel(16);
        pump_lines(&b"a\rb\r"[..], StreamKind::Stdout, false, tx).await;

        assert_eq!(
            drain(rx).await,
            vec![line("a"), line("b"), StreamMessage::Closed(StreamKind::Stdout)]
        );
    }

    #[tokio::test]
    async fn trailing_fragment_is_dropped_by_default() {
        let (tx, rx) = mpsc::channel(16);
        pump_lines(&b"a\nb"[..], StreamKind::Stdout, false, tx).await;

        assert_eq!(
            drain(rx).await,
            vec![line("a"), StreamMessage::Closed(StreamKind::Stdout)]
        );
    }

    #[tokio::test]
    async fn trailing_fragment_is_flushed_when_requested() {
        let (tx, rx) = mpsc::channel(16);
        pump_lines(&b"a\nb"[..], StreamKind::Stdout, true, tx).await;

        assert_eq!(
            drain(rx).await,
            vec![line("a"), line("b"), StreamMessage::Closed(StreamKind::Stdout)]
        );
    }

    #[tokio::test]
    async fn read_error_closes_stream_like_eof() {
        let (tx, rx) = mpsc::channel(16);
        let source = FailingSource::new(&["one\ntw", "o\npartial"]);
        pump_lines(source, StreamKind::Stderr, false, tx).await;

        assert_eq!(
            drain(rx).await,
            vec![
                StreamMessage::Line(StreamKind::Stderr, "one".into()),
                StreamMessage::Line(StreamKind::Stderr, "two".into()),
                StreamMessage::Closed(StreamKind::Stderr),
            ]
        );
    }

    #[tokio::test]
    async fn reader_stops_quietly_when_coordinator_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        pump_lines(&b"x\ny\n"[..], StreamKind::Stdout, false, tx).await;
    }
}
