// src/types.rs

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use clap::ValueEnum;
use serde::Deserialize;

bitflags! {
    /// Which streams a run captures and how its command is launched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CaptureFlags: u32 {
        /// Pipe and frame the child's stdout.
        const STDOUT = 0x01;
        /// Pipe and frame the child's stderr.
        const STDERR = 0x02;
        const BOTH = Self::STDOUT.bits() | Self::STDERR.bits();
        /// Run the command through the platform shell instead of exec'ing it.
        const NEEDS_SHELL = 0x04;
        /// Emit an unterminated trailing fragment as a final line when its
        /// stream closes. Off by default: such fragments are dropped.
        const FLUSH_PARTIAL = 0x08;
    }
}

impl Default for CaptureFlags {
    fn default() -> Self {
        CaptureFlags::BOTH | CaptureFlags::NEEDS_SHELL
    }
}

impl CaptureFlags {
    /// Build flags from the coarse settings used by tool files and the CLI.
    pub fn from_parts(mode: CaptureMode, shell: bool, flush_partial: bool) -> Self {
        let mut flags = mode.flags();
        flags.set(CaptureFlags::NEEDS_SHELL, shell);
        flags.set(CaptureFlags::FLUSH_PARTIAL, flush_partial);
        flags
    }
}

/// Which output streams to capture, as spelled in tool files and on the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    None,
    Stdout,
    Stderr,
    #[default]
    Both,
}

impl CaptureMode {
    pub fn flags(self) -> CaptureFlags {
        match self {
            CaptureMode::None => CaptureFlags::empty(),
            CaptureMode::Stdout => CaptureFlags::STDOUT,
            CaptureMode::Stderr => CaptureFlags::STDERR,
            CaptureMode::Both => CaptureFlags::BOTH,
        }
    }
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(CaptureMode::None),
            "stdout" => Ok(CaptureMode::Stdout),
            "stderr" => Ok(CaptureMode::Stderr),
            "both" => Ok(CaptureMode::Both),
            other => Err(format!(
                "invalid capture mode: {other} (expected \"none\", \"stdout\", \"stderr\" or \"both\")"
            )),
        }
    }
}

/// The command a run executes.
///
/// - `Shell` is a single command string. With `NEEDS_SHELL` it goes to
///   `sh -c` verbatim; without it, it is split on whitespace.
/// - `Argv` is an explicit argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    Shell(String),
    Argv(Vec<String>),
}

impl CommandLine {
    /// True if there is no program to run.
    pub fn is_empty(&self) -> bool {
        match self {
            CommandLine::Shell(s) => s.trim().is_empty(),
            CommandLine::Argv(argv) => argv.first().is_none_or(|p| p.trim().is_empty()),
        }
    }
}

impl From<&str> for CommandLine {
    fn from(s: &str) -> Self {
        CommandLine::Shell(s.to_string())
    }
}

impl From<String> for CommandLine {
    fn from(s: String) -> Self {
        CommandLine::Shell(s)
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(argv: Vec<String>) -> Self {
        CommandLine::Argv(argv)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Shell(s) => f.write_str(s),
            CommandLine::Argv(argv) => f.write_str(&argv.join(" ")),
        }
    }
}

/// One of the two captured output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
