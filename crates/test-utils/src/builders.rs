#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use capture::config::{DefaultSection, RawToolFile, ToolConfig, ToolFile};
use capture::types::CaptureMode;

/// Builder for `ToolFile` to simplify test setup.
pub struct ToolFileBuilder {
    raw: RawToolFile,
}

impl ToolFileBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawToolFile {
                default: DefaultSection::default(),
                tool: BTreeMap::new(),
            },
        }
    }

    pub fn with_tool(mut self, name: &str, tool: ToolConfig) -> Self {
        self.raw.tool.insert(name.to_string(), tool);
        self
    }

    pub fn with_default_env(mut self, key: &str, value: &str) -> Self {
        self.raw.default.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_default_shell(mut self, val: bool) -> Self {
        self.raw.default.shell = Some(val);
        self
    }

    pub fn with_default_capture(mut self, mode: CaptureMode) -> Self {
        self.raw.default.capture = Some(mode);
        self
    }

    pub fn build(self) -> ToolFile {
        ToolFile::try_from(self.raw).expect("Failed to build valid tool file from builder")
    }
}

impl Default for ToolFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ToolConfig`.
pub struct ToolConfigBuilder {
    tool: ToolConfig,
}

impl ToolConfigBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            tool: ToolConfig {
                command: command.to_string(),
                description: None,
                cwd: None,
                env: BTreeMap::new(),
                shell: None,
                capture: None,
                flush_partial: None,
                input: None,
            },
        }
    }

    pub fn description(mut self, text: &str) -> Self {
        self.tool.description = Some(text.to_string());
        self
    }

    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.tool.cwd = Some(path.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.tool.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn shell(mut self, val: bool) -> Self {
        self.tool.shell = Some(val);
        self
    }

    pub fn capture(mut self, mode: CaptureMode) -> Self {
        self.tool.capture = Some(mode);
        self
    }

    pub fn flush_partial(mut self, val: bool) -> Self {
        self.tool.flush_partial = Some(val);
        self
    }

    pub fn input(mut self, text: &str) -> Self {
        self.tool.input = Some(text.to_string());
        self
    }

    pub fn build(self) -> ToolConfig {
        self.tool
    }
}
