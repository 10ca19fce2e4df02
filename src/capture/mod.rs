// src/capture/mod.rs

//! Asynchronous external-process capture.
//!
//! A [`Capture`] runs one command at a time, feeds it optional input and
//! publishes its output line by line:
//!
//! - [`launcher`] resolves the command line and spawns the child.
//! - [`reader`] frames stdout/stderr into lines ([`LineFramer`]).
//! - [`writer`] feeds stdin in bounded chunks.
//! - [`terminate`] maps stop requests onto signals.
//! - [`lifecycle`] is the per-run coordinator that orders events and decides
//!   when `End` may fire.
//!
//! Failures never come back from [`Capture::execute`]; subscribers learn about
//! them from the event stream.

pub mod events;
pub(crate) mod launcher;
pub(crate) mod lifecycle;
pub mod reader;
pub mod terminate;
pub mod writer;

use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::types::{CaptureFlags, CommandLine};

pub use events::{CaptureEvent, ExitStatus};
pub use reader::LineFramer;
pub use terminate::Escalation;
pub use writer::WRITE_CHUNK_SIZE;

use events::Subscribers;
use lifecycle::Control;

/// Everything needed to start a run. Copied at `execute()` time, so changing
/// it afterwards only affects the next run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSpec {
    /// `None` makes `execute()` a no-op.
    pub command: Option<CommandLine>,
    pub cwd: Option<PathBuf>,
    /// Overlay merged over the inherited environment.
    pub env: BTreeMap<String, String>,
    pub flags: CaptureFlags,
    /// Text written to the child's stdin, UTF-8 encoded.
    pub input: Option<String>,
}

impl RunSpec {
    pub fn new(command: impl Into<CommandLine>) -> Self {
        Self {
            command: Some(command.into()),
            ..Default::default()
        }
    }
}

/// Capture-side view of a live run.
#[derive(Debug)]
struct RunHandle {
    pid: Option<u32>,
    control: mpsc::UnboundedSender<Control>,
    kill_attempted: bool,
}

impl RunHandle {
    /// False once the coordinator has emitted `End` and gone away.
    fn is_live(&self) -> bool {
        !self.control.is_closed()
    }
}

/// Runs one external command at a time and publishes its events.
///
/// Must be driven from inside a Tokio runtime.
#[derive(Debug, Default)]
pub struct Capture {
    spec: RunSpec,
    subscribers: Subscribers,
    run: Option<RunHandle>,
}

impl Capture {
    pub fn new(command: impl Into<CommandLine>) -> Self {
        Self::from_spec(RunSpec::new(command))
    }

    pub fn from_spec(spec: RunSpec) -> Self {
        Self {
            spec,
            ..Default::default()
        }
    }

    pub fn spec(&self) -> &RunSpec {
        &self.spec
    }

    /// Replace command, working directory and environment overlay at once.
    pub fn configure(
        &mut self,
        command: impl Into<CommandLine>,
        cwd: Option<PathBuf>,
        env: BTreeMap<String, String>,
    ) {
        self.spec.command = Some(command.into());
        self.spec.cwd = cwd;
        self.spec.env = env;
    }

    pub fn set_command(&mut self, command: impl Into<CommandLine>) {
        self.spec.command = Some(command.into());
    }

    /// Add to (or override entries of) the environment overlay.
    pub fn set_env<I, K, V>(&mut self, extra: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.spec
            .env
            .extend(extra.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    pub fn set_flags(&mut self, flags: CaptureFlags) {
        self.spec.flags = flags;
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.spec.input = Some(text.into());
    }

    pub fn set_cwd(&mut self, cwd: impl Into<PathBuf>) {
        self.spec.cwd = Some(cwd.into());
    }

    /// Register a subscriber. It receives every event of runs started after
    /// this call.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CaptureEvent> {
        self.subscribers.subscribe()
    }

    /// True while the current run has not delivered `End` and has not been
    /// forgotten by a forceful stop.
    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(RunHandle::is_live)
    }

    /// Pid of the current run's child, if a run handle is held.
    pub fn pid(&self) -> Option<u32> {
        self.run.as_ref().and_then(|run| run.pid)
    }

    /// Start a run. Returns immediately.
    ///
    /// - No command set: does nothing.
    /// - Spawn failure (empty command included): emits one `StderrLine`
    ///   describing it; no `Begin`, no `End`.
    /// - Otherwise emits `Begin` before returning; lines and `End` follow
    ///   asynchronously.
    pub fn execute(&mut self) {
        let Some(command) = self.spec.command.clone() else {
            debug!("execute without a command; ignoring");
            return;
        };

        if let Some(previous) = self.run.take() {
            if previous.is_live() {
                warn!(pid = ?previous.pid, "execute while a run is live; detaching the previous run");
            }
        }

        self.subscribers.prune();
        let spec = self.spec.clone();

        let child = match launcher::launch(&spec, &command) {
            Ok(child) => child,
            Err(err) => {
                warn!(%command, error = %err, "could not execute command");
                self.subscribers
                    .emit(CaptureEvent::StderrLine(format!("Could not execute command: {err}")));
                return;
            }
        };

        let pid = child.id();
        self.subscribers.emit(CaptureEvent::Begin);

        let control = lifecycle::start(
            child,
            spec.flags,
            spec.input.as_deref(),
            self.subscribers.clone(),
        );

        self.run = Some(RunHandle {
            pid,
            control,
            kill_attempted: false,
        });
    }

    /// Cancel the current run.
    ///
    /// Stdin is closed and both readers are torn down right away. The first
    /// call on a live run then asks the child to terminate; the second kills
    /// it and forgets the run; further calls do nothing. `End` still arrives
    /// once the OS reports the exit, carrying `exit_code_hint` only if no
    /// real status can be obtained.
    pub fn stop(&mut self, exit_code_hint: i32) {
        let Some(run) = self.run.as_mut() else {
            debug!("stop without a live run; ignoring");
            return;
        };

        if !run.is_live() {
            debug!(pid = ?run.pid, "stop after run finished; forgetting it");
            self.run = None;
            return;
        }

        let escalation = Escalation::next(run.kill_attempted);
        info!(pid = ?run.pid, ?escalation, "stop requested");

        let request = Control::Stop {
            escalation,
            exit_code_hint,
        };
        if run.control.send(request).is_err() {
            debug!(pid = ?run.pid, "run finished before the stop request; forgetting it");
            self.run = None;
            return;
        }

        match escalation {
            Escalation::Graceful => run.kill_attempted = true,
            Escalation::Forceful => self.run = None,
        }
    }
}
