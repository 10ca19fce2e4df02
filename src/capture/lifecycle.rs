// src/capture/lifecycle.rs

//! Per-run coordinator.
//!
//! After `Begin`, every event of a run is emitted from one Tokio task (the
//! [`RunLoop`]). It multiplexes:
//! - line/closure messages from the reader tasks,
//! - the child's exit status,
//! - stop requests from the owning `Capture`.
//!
//! `End` is gated on a [`CompletionGate`]: both captured streams closed and
//! the exit status known. Lines and closure of a stream share one FIFO
//! channel, so every line a reader extracted is dispatched before `End`.

use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::types::{CaptureFlags, StreamKind};

use super::events::{CaptureEvent, ExitStatus, Subscribers};
use super::reader::{spawn_reader, StreamMessage};
use super::terminate::{signal_child, Escalation};
use super::writer::{spawn_writer, PendingWrite};

/// Capacity of the reader -> coordinator channel.
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Exit code reported when the OS status cannot be obtained and no stop
/// supplied a hint.
pub(crate) const DEFAULT_EXIT_CODE_HINT: i32 = -1;

/// Requests from the owning `Capture` to its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Stop {
        escalation: Escalation,
        exit_code_hint: i32,
    },
}

/// Tracks the three conditions `End` waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CompletionGate {
    stdout_open: bool,
    stderr_open: bool,
    status: Option<ExitStatus>,
    fired: bool,
}

impl CompletionGate {
    /// Streams that are not captured count as already closed.
    pub(crate) fn new(stdout_captured: bool, stderr_captured: bool) -> Self {
        Self {
            stdout_open: stdout_captured,
            stderr_open: stderr_captured,
            status: None,
            fired: false,
        }
    }

    pub(crate) fn is_open(&self, kind: StreamKind) -> bool {
        match kind {
            StreamKind::Stdout => self.stdout_open,
            StreamKind::Stderr => self.stderr_open,
        }
    }

    /// Mark a stream closed. Returns false if it already was.
    pub(crate) fn close(&mut self, kind: StreamKind) -> bool {
        let slot = match kind {
            StreamKind::Stdout => &mut self.stdout_open,
            StreamKind::Stderr => &mut self.stderr_open,
        };
        std::mem::replace(slot, false)
    }

    pub(crate) fn streams_open(&self) -> usize {
        usize::from(self.stdout_open) + usize::from(self.stderr_open)
    }

    pub(crate) fn record_exit(&mut self, status: ExitStatus) {
        self.status.get_or_insert(status);
    }

    pub(crate) fn exit_status(&self) -> Option<ExitStatus> {
        self.status
    }

    /// The exit status, exactly once, as soon as every condition holds.
    pub(crate) fn take_ready(&mut self) -> Option<ExitStatus> {
        if self.fired || self.streams_open() > 0 {
            return None;
        }
        let status = self.status?;
        self.fired = true;
        Some(status)
    }
}

/// Coordinator state for one live run.
pub(crate) struct RunLoop {
    child: Child,
    pid: Option<u32>,
    subscribers: Subscribers,
    stream_rx: mpsc::Receiver<StreamMessage>,
    control_rx: mpsc::UnboundedReceiver<Control>,
    stdout_reader: Option<JoinHandle<()>>,
    stderr_reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    gate: CompletionGate,
    exit_code_hint: i32,
}

/// Wire readers, writer and exit watch around a freshly spawned child and
/// start its coordinator. Returns the sender `Capture` uses for stop requests.
pub(crate) fn start(
    mut child: Child,
    flags: CaptureFlags,
    input: Option<&str>,
    subscribers: Subscribers,
) -> mpsc::UnboundedSender<Control> {
    let flush_partial = flags.contains(CaptureFlags::FLUSH_PARTIAL);
    let (stream_tx, stream_rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

    let stdout_reader = child
        .stdout
        .take()
        .map(|out| spawn_reader(out, StreamKind::Stdout, flush_partial, stream_tx.clone()));
    let stderr_reader = child
        .stderr
        .take()
        .map(|err| spawn_reader(err, StreamKind::Stderr, flush_partial, stream_tx.clone()));
    drop(stream_tx);

    let writer = match (child.stdin.take(), input) {
        (Some(stdin), Some(text)) => Some(spawn_writer(stdin, PendingWrite::new(text))),
        _ => None,
    };

    let gate = CompletionGate::new(stdout_reader.is_some(), stderr_reader.is_some());
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    let run = RunLoop {
        pid: child.id(),
        child,
        subscribers,
        stream_rx,
        control_rx,
        stdout_reader,
        stderr_reader,
        writer,
        gate,
        exit_code_hint: DEFAULT_EXIT_CODE_HINT,
    };
    tokio::spawn(run.run());

    control_tx
}

impl RunLoop {
    async fn run(mut self) {
        debug!(pid = ?self.pid, streams = self.gate.streams_open(), "run coordinator started");

        loop {
            if let Some(status) = self.gate.take_ready() {
                info!(pid = ?self.pid, ?status, "run finished");
                // `Capture::is_running` must already read false when `End`
                // is observed.
                self.control_rx.close();
                self.subscribers.emit(CaptureEvent::End(status));
                break;
            }

            tokio::select! {
                status = self.child.wait(), if self.gate.exit_status().is_none() => {
                    let status = match status {
                        Ok(status) => ExitStatus::from(status),
                        Err(e) => {
                            warn!(pid = ?self.pid, error = %e, "could not obtain exit status");
                            ExitStatus::Exited(self.exit_code_hint)
                        }
                    };
                    debug!(pid = ?self.pid, ?status, streams_open = self.gate.streams_open(), "child exited");
                    self.gate.record_exit(status);
                }
                Some(message) = self.stream_rx.recv() => self.dispatch(message),
                Some(control) = self.control_rx.recv() => self.handle_control(control),
                else => {
                    // Every reader is gone and the status is known; whatever
                    // is still marked open can never report closure.
                    self.close_stream(StreamKind::Stdout);
                    self.close_stream(StreamKind::Stderr);
                }
            }
        }
    }

    fn dispatch(&mut self, message: StreamMessage) {
        match message {
            StreamMessage::Line(kind, text) => {
                // Lines still queued from a torn-down reader are discarded.
                if self.gate.is_open(kind) {
                    self.subscribers.emit(CaptureEvent::line(kind, text));
                }
            }
            StreamMessage::Closed(kind) => self.close_stream(kind),
        }
    }

    fn close_stream(&mut self, kind: StreamKind) {
        if self.gate.close(kind) {
            debug!(
                pid = ?self.pid,
                stream = %kind,
                remaining = self.gate.streams_open(),
                "captured stream closed"
            );
        }
    }

    fn handle_control(&mut self, control: Control) {
        let Control::Stop {
            escalation,
            exit_code_hint,
        } = control;
        self.exit_code_hint = exit_code_hint;

        if let Some(writer) = self.writer.take() {
            writer.abort();
            debug!(pid = ?self.pid, "input writer cancelled");
        }

        for (kind, reader) in [
            (StreamKind::Stdout, self.stdout_reader.take()),
            (StreamKind::Stderr, self.stderr_reader.take()),
        ] {
            if let Some(reader) = reader {
                reader.abort();
            }
            self.close_stream(kind);
        }

        if self.gate.exit_status().is_some() {
            debug!(pid = ?self.pid, "stop after exit; nothing to signal");
            return;
        }

        info!(pid = ?self.pid, ?escalation, "signalling child");
        if let Err(e) = signal_child(&mut self.child, escalation) {
            warn!(pid = ?self.pid, ?escalation, error = %e, "failed to signal child");
        }
    }
}
