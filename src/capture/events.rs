// src/capture/events.rs

//! Events a [`Capture`](super::Capture) publishes to its subscribers.

use tokio::sync::mpsc;
use tracing::trace;

use crate::types::StreamKind;

/// Lifecycle and output events of one run, in delivery order:
/// `Begin`, any number of line events, then exactly one `End`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// The child process was spawned.
    Begin,
    /// One complete stdout line, terminator stripped.
    StdoutLine(String),
    /// One complete stderr line, terminator stripped. Spawn failures are also
    /// reported through this event.
    StderrLine(String),
    /// The child exited and every captured stream has closed.
    End(ExitStatus),
}

impl CaptureEvent {
    pub fn line(kind: StreamKind, text: String) -> Self {
        match kind {
            StreamKind::Stdout => CaptureEvent::StdoutLine(text),
            StreamKind::Stderr => CaptureEvent::StderrLine(text),
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, CaptureEvent::End(_))
    }
}

/// How the child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Normal exit with the given code.
    Exited(i32),
    /// Terminated by the given signal number (Unix only).
    Signaled(i32),
}

impl ExitStatus {
    /// Shell-style numeric status: the exit code, or `128 + signal`.
    pub fn code(&self) -> i32 {
        match *self {
            ExitStatus::Exited(code) => code,
            ExitStatus::Signaled(signal) => 128 + signal,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Exited(0))
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitStatus::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitStatus::Signaled(signal);
            }
        }

        ExitStatus::Exited(-1)
    }
}

/// The subscriber set of one `Capture` instance.
///
/// Each run gets a snapshot of the set taken at `execute()` time.
#[derive(Debug, Clone, Default)]
pub(crate) struct Subscribers {
    senders: Vec<mpsc::UnboundedSender<CaptureEvent>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CaptureEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        rx
    }

    /// Forget subscribers whose receiver has been dropped.
    pub(crate) fn prune(&mut self) {
        self.senders.retain(|tx| !tx.is_closed());
    }

    pub(crate) fn emit(&self, event: CaptureEvent) {
        trace!(?event, subscribers = self.senders.len(), "emitting capture event");
        for tx in &self.senders {
            let _ = tx.send(event.clone());
        }
    }
}
