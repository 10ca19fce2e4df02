// src/lib.rs

pub mod capture;
pub mod cli;
pub mod config;
pub mod duration;
pub mod errors;
pub mod logging;
pub mod types;

pub use crate::capture::{Capture, CaptureEvent, ExitStatus, RunSpec};
pub use crate::types::{CaptureFlags, CommandLine};

use std::pin::pin;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ToolFile};
use crate::errors::CaptureError;
use crate::types::CaptureMode;

/// Exit code used when the command could not be started at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - tool-file loading (for `--tool` / `--list`)
/// - the run spec from CLI overrides
/// - a `Capture` and its event stream
/// - the `--timeout` timer and Ctrl-C, both escalating through `stop()`
///
/// Returns the exit code `capture` itself should exit with.
pub async fn run(args: CliArgs) -> Result<i32> {
    if args.list {
        let tools = load_and_validate(&args.config)?;
        print_tools(&tools);
        return Ok(0);
    }

    let spec = build_run_spec(&args)?;
    info!(command = ?spec.command, cwd = ?spec.cwd, flags = ?spec.flags, "running command");

    let mut capture = Capture::from_spec(spec);
    let events = capture.subscribe();
    capture.execute();

    Ok(supervise(capture, events, args.timeout, args.kill_after).await)
}

/// Combine the tool file (if `--tool`) with CLI overrides into a `RunSpec`.
pub fn build_run_spec(args: &CliArgs) -> Result<RunSpec> {
    let mut spec = match args.tool {
        Some(ref name) => load_and_validate(&args.config)?.run_spec(name)?,
        None => {
            if args.command.is_empty() {
                return Err(CaptureError::ConfigError(
                    "no command given; pass one after `--` or use --tool".to_string(),
                )
                .into());
            }
            let command = if args.no_shell {
                CommandLine::Argv(args.command.clone())
            } else {
                CommandLine::Shell(args.command.join(" "))
            };
            RunSpec::new(command)
        }
    };

    if let Some(ref cwd) = args.cwd {
        spec.cwd = Some(cwd.clone());
    }
    spec.env.extend(args.env.iter().cloned());

    if let Some(ref text) = args.input {
        spec.input = Some(text.clone());
    } else if let Some(ref path) = args.input_file {
        spec.input = Some(std::fs::read_to_string(path).map_err(CaptureError::from)?);
    }

    if let Some(mode) = args.capture {
        let keep = spec.flags & (CaptureFlags::NEEDS_SHELL | CaptureFlags::FLUSH_PARTIAL);
        spec.flags = keep | mode.flags();
    } else if args.tool.is_none() {
        spec.flags = CaptureFlags::from_parts(CaptureMode::Both, true, false);
    }
    if args.no_shell {
        spec.flags.remove(CaptureFlags::NEEDS_SHELL);
    }
    if args.flush_partial {
        spec.flags.insert(CaptureFlags::FLUSH_PARTIAL);
    }

    Ok(spec)
}

/// Print captured lines until the run ends, escalating stop requests on
/// timeout and Ctrl-C. Returns the exit code to report.
async fn supervise(
    mut capture: Capture,
    mut events: mpsc::UnboundedReceiver<CaptureEvent>,
    timeout: Option<Duration>,
    kill_after: Duration,
) -> i32 {
    // Spawn failure: the error line is already queued and nothing else follows.
    if capture.pid().is_none() {
        while let Ok(event) = events.try_recv() {
            print_event(&event);
        }
        return SPAWN_FAILURE_EXIT_CODE;
    }

    let mut next_stop = timeout.and_then(deadline_after);
    let mut ctrl_c = pin!(tokio::signal::ctrl_c());
    let mut ctrl_c_armed = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(CaptureEvent::End(status)) => {
                    debug!(?status, "command finished");
                    return status.code();
                }
                Some(event) => print_event(&event),
                None => {
                    warn!("event stream closed without an end event");
                    return 1;
                }
            },
            _ = sleep_until(next_stop.unwrap_or_else(Instant::now)), if next_stop.is_some() => {
                warn!("timeout reached; stopping command");
                capture.stop(-1);
                next_stop = if capture.is_running() {
                    deadline_after(kill_after)
                } else {
                    None
                };
            }
            res = &mut ctrl_c, if ctrl_c_armed => match res {
                Ok(()) => {
                    info!("Ctrl+C received; stopping command");
                    capture.stop(130);
                    ctrl_c.set(tokio::signal::ctrl_c());
                }
                Err(e) => {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                    ctrl_c_armed = false;
                }
            },
        }
    }
}

/// `now + after`, or no deadline at all if that is not representable.
fn deadline_after(after: Duration) -> Option<Instant> {
    let deadline = Instant::now().checked_add(after);
    if deadline.is_none() {
        warn!(?after, "duration too large for a deadline; not scheduling a stop");
    }
    deadline
}

fn print_event(event: &CaptureEvent) {
    match event {
        CaptureEvent::StdoutLine(line) => println!("{line}"),
        CaptureEvent::StderrLine(line) => eprintln!("{line}"),
        CaptureEvent::Begin | CaptureEvent::End(_) => {}
    }
}

fn print_tools(tools: &ToolFile) {
    println!("tools ({}):", tools.tool.len());
    for (name, tool) in tools.tool.iter() {
        match tool.description {
            Some(ref desc) => println!("  - {name}: {desc}"),
            None => println!("  - {name}"),
        }
        println!("      command: {}", tool.command);
        if let Some(ref cwd) = tool.cwd {
            println!("      cwd: {}", cwd.display());
        }
        println!("      capture: {:?}", tool.effective_capture(&tools.default));
        if !tool.effective_shell(&tools.default) {
            println!("      shell: false");
        }
        if tool.input.is_some() {
            println!("      input: yes");
        }
    }
}
