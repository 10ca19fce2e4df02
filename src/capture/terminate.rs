// src/capture/terminate.rs

//! Termination controller: graceful-then-forceful stop requests.

use tokio::process::Child;

/// The two escalation steps a stop request can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Ask the process to exit (SIGTERM on Unix).
    Graceful,
    /// Kill the process outright (SIGKILL on Unix).
    Forceful,
}

impl Escalation {
    /// The step to take given whether a stop was already attempted this run.
    pub fn next(kill_attempted: bool) -> Self {
        if kill_attempted {
            Escalation::Forceful
        } else {
            Escalation::Graceful
        }
    }
}

/// Deliver `escalation` to the child. Does not wait for it to exit.
pub(crate) fn signal_child(child: &mut Child, escalation: Escalation) -> std::io::Result<()> {
    match escalation {
        Escalation::Graceful => request_graceful(child),
        Escalation::Forceful => child.start_kill(),
    }
}

#[cfg(unix)]
fn request_graceful(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // Already reaped: nothing left to signal.
    let Some(pid) = child.id() else {
        return Ok(());
    };

    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(std::io::Error::from)
}

// No cooperative equivalent to SIGTERM here; fall back to terminating.
#[cfg(not(unix))]
fn request_graceful(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}
