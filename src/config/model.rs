// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::capture::RunSpec;
use crate::errors::{CaptureError, Result};
use crate::types::{CaptureFlags, CaptureMode, CommandLine};

/// Tool file as read from TOML, before validation.
///
/// ```toml
/// [default]
/// shell = true
/// capture = "both"
/// env = { LANG = "C" }
///
/// [tool.todos]
/// command = "grep -rn TODO ."
/// cwd = "src"
/// capture = "stdout"
/// ```
///
/// All sections are optional at the TOML level; validation then requires at
/// least one tool.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawToolFile {
    /// Settings applied to every tool that does not override them.
    #[serde(default)]
    pub default: DefaultSection,

    /// All tools from `[tool.<name>]`, keyed by name.
    #[serde(default)]
    pub tool: BTreeMap<String, ToolConfig>,
}

/// `[default]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultSection {
    /// Run commands through the shell; `true` when unset.
    #[serde(default)]
    pub shell: Option<bool>,

    /// Streams to capture; `both` when unset.
    #[serde(default)]
    pub capture: Option<CaptureMode>,

    /// Emit unterminated trailing fragments; `false` when unset.
    #[serde(default)]
    pub flush_partial: Option<bool>,

    /// Environment overlay shared by all tools. Tool entries win.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[tool.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolConfig {
    /// Command line. Passed to the shell unless `shell = false`, in which
    /// case it is split on whitespace.
    pub command: String,

    /// Short human-readable description, shown by `--list`.
    #[serde(default)]
    pub description: Option<String>,

    /// Working directory; relative paths are resolved against the tool
    /// file's directory when loading.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub shell: Option<bool>,

    #[serde(default)]
    pub capture: Option<CaptureMode>,

    #[serde(default)]
    pub flush_partial: Option<bool>,

    /// Text written to the command's stdin.
    #[serde(default)]
    pub input: Option<String>,
}

/// A validated tool file. Only obtainable through `TryFrom<RawToolFile>`.
#[derive(Debug, Clone)]
pub struct ToolFile {
    pub default: DefaultSection,
    pub tool: BTreeMap<String, ToolConfig>,
}

impl ToolFile {
    pub(crate) fn new_unchecked(default: DefaultSection, tool: BTreeMap<String, ToolConfig>) -> Self {
        Self { default, tool }
    }

    /// Names of all tools, sorted.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tool.keys().map(String::as_str)
    }

    /// Build the run spec for tool `name`, applying `[default]`.
    pub fn run_spec(&self, name: &str) -> Result<RunSpec> {
        let tool = self
            .tool
            .get(name)
            .ok_or_else(|| CaptureError::ToolNotFound(name.to_string()))?;
        Ok(tool.to_run_spec(&self.default))
    }
}

impl ToolConfig {
    pub fn effective_shell(&self, defaults: &DefaultSection) -> bool {
        self.shell.or(defaults.shell).unwrap_or(true)
    }

    pub fn effective_capture(&self, defaults: &DefaultSection) -> CaptureMode {
        self.capture.or(defaults.capture).unwrap_or_default()
    }

    pub fn effective_flush_partial(&self, defaults: &DefaultSection) -> bool {
        self.flush_partial.or(defaults.flush_partial).unwrap_or(false)
    }

    pub fn to_run_spec(&self, defaults: &DefaultSection) -> RunSpec {
        let mut env = defaults.env.clone();
        env.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        RunSpec {
            command: Some(CommandLine::Shell(self.command.clone())),
            cwd: self.cwd.clone(),
            env,
            flags: CaptureFlags::from_parts(
                self.effective_capture(defaults),
                self.effective_shell(defaults),
                self.effective_flush_partial(defaults),
            ),
            input: self.input.clone(),
        }
    }
}
