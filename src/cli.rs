// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::duration::parse_duration;
use crate::errors::CaptureError;
use crate::types::CaptureMode;

/// Command-line arguments for `capture`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "capture",
    version,
    about = "Run a command and stream its output line by line.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the tool file (TOML) used by `--tool` and `--list`.
    #[arg(long, value_name = "PATH", default_value = "Tools.toml")]
    pub config: PathBuf,

    /// Run the named tool from the tool file instead of COMMAND.
    #[arg(long, value_name = "NAME", conflicts_with = "command")]
    pub tool: Option<String>,

    /// List the tools in the tool file and exit.
    #[arg(long)]
    pub list: bool,

    /// Working directory for the command.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Extra environment variable for the command (repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Text to write to the command's stdin.
    #[arg(long, value_name = "TEXT", conflicts_with = "input_file")]
    pub input: Option<String>,

    /// File whose contents are written to the command's stdin.
    #[arg(long, value_name = "PATH")]
    pub input_file: Option<PathBuf>,

    /// Which output streams to capture.
    #[arg(long, value_enum, value_name = "MODE")]
    pub capture: Option<CaptureMode>,

    /// Exec the command directly instead of through the shell.
    #[arg(long)]
    pub no_shell: bool,

    /// Print an unterminated last line when a stream closes.
    #[arg(long)]
    pub flush_partial: bool,

    /// Ask the command to stop after this long (e.g. `500ms`, `10s`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_arg)]
    pub timeout: Option<Duration>,

    /// After a stop request, wait this long before killing.
    #[arg(long, value_name = "DURATION", default_value = "2s", value_parser = parse_duration_arg)]
    pub kill_after: Duration,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CAPTURE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Command to run (everything after `--`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

fn parse_duration_arg(s: &str) -> Result<Duration, CaptureError> {
    parse_duration(s)
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_command_keeps_its_own_flags() {
        let args = CliArgs::try_parse_from(["capture", "--timeout", "3s", "--", "ls", "-la"]).unwrap();
        assert_eq!(args.command, vec!["ls", "-la"]);
        assert_eq!(args.timeout, Some(Duration::from_secs(3)));
        assert_eq!(args.kill_after, Duration::from_secs(2));
    }

    #[test]
    fn env_pairs_are_split_on_first_equals() {
        let args =
            CliArgs::try_parse_from(["capture", "--env", "A=1", "--env", "B=x=y", "--", "env"]).unwrap();
        assert_eq!(
            args.env,
            vec![("A".to_string(), "1".to_string()), ("B".to_string(), "x=y".to_string())]
        );
        assert!(CliArgs::try_parse_from(["capture", "--env", "=1"]).is_err());
    }

    #[test]
    fn tool_conflicts_with_command() {
        assert!(CliArgs::try_parse_from(["capture", "--tool", "t", "--", "ls"]).is_err());
    }
}
