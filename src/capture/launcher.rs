// src/capture/launcher.rs

//! Turns a [`RunSpec`] into a spawned child process.

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::errors::SpawnError;
use crate::types::{CaptureFlags, CommandLine};

use super::RunSpec;

/// Resolve the program and arguments to exec for a command line.
///
/// With `shell`, the command goes through `sh -c` (`cmd /C` on Windows). For
/// an argv, the first word is the script and the rest become its positional
/// parameters, starting at `$0`.
pub(crate) fn resolve_program(
    command: &CommandLine,
    shell: bool,
) -> Result<(String, Vec<String>), SpawnError> {
    if command.is_empty() {
        return Err(SpawnError::EmptyCommand);
    }

    let resolved = match (command, shell) {
        (CommandLine::Shell(line), true) => shell_invocation(vec![line.clone()]),
        (CommandLine::Argv(argv), true) => shell_invocation(argv.clone()),
        (CommandLine::Shell(line), false) => {
            let mut words = line.split_whitespace().map(str::to_string);
            let program = words.next().ok_or(SpawnError::EmptyCommand)?;
            (program, words.collect())
        }
        (CommandLine::Argv(argv), false) => {
            let (program, args) = argv.split_first().ok_or(SpawnError::EmptyCommand)?;
            (program.clone(), args.to_vec())
        }
    };

    Ok(resolved)
}

fn shell_invocation(script: Vec<String>) -> (String, Vec<String>) {
    if cfg!(windows) {
        let mut args = vec!["/C".to_string()];
        args.push(script.join(" "));
        ("cmd".to_string(), args)
    } else {
        let mut args = vec!["-c".to_string()];
        args.extend(script);
        ("sh".to_string(), args)
    }
}

/// Spawn the child for `spec`.
///
/// Stdin is piped only when the spec carries input; stdout/stderr only when
/// the matching capture flag is set. Anything not piped is inherited.
pub(crate) fn launch(spec: &RunSpec, command: &CommandLine) -> Result<Child, SpawnError> {
    let (program, args) = resolve_program(command, spec.flags.contains(CaptureFlags::NEEDS_SHELL))?;

    let mut cmd = Command::new(&program);
    cmd.args(&args).envs(&spec.env).kill_on_drop(true);

    if let Some(ref cwd) = spec.cwd {
        cmd.current_dir(cwd);
    }

    cmd.stdin(piped_if(spec.input.is_some()))
        .stdout(piped_if(spec.flags.contains(CaptureFlags::STDOUT)))
        .stderr(piped_if(spec.flags.contains(CaptureFlags::STDERR)));

    debug!(%program, ?args, cwd = ?spec.cwd, env_overlay = spec.env.len(), "spawning child");

    let child = cmd
        .spawn()
        .map_err(|source| SpawnError::Spawn { program, source })?;

    info!(pid = ?child.id(), %command, flags = ?spec.flags, "child process started");

    Ok(child)
}

fn piped_if(piped: bool) -> Stdio {
    if piped { Stdio::piped() } else { Stdio::inherit() }
}
