// src/config/validate.rs

use crate::config::model::{RawToolFile, ToolFile};
use crate::errors::{CaptureError, Result};

impl TryFrom<RawToolFile> for ToolFile {
    type Error = CaptureError;

    fn try_from(raw: RawToolFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_tools(&raw)?;
        Ok(ToolFile::new_unchecked(raw.default, raw.tool))
    }
}

fn validate_raw_tools(raw: &RawToolFile) -> Result<()> {
    ensure_has_tools(raw)?;
    validate_tool_names(raw)?;
    validate_commands(raw)?;
    validate_env_keys(raw)?;
    Ok(())
}

fn ensure_has_tools(raw: &RawToolFile) -> Result<()> {
    if raw.tool.is_empty() {
        return Err(CaptureError::ConfigError(
            "tool file must contain at least one [tool.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_tool_names(raw: &RawToolFile) -> Result<()> {
    for name in raw.tool.keys() {
        if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
            return Err(CaptureError::ConfigError(format!(
                "tool name '{name}' must be non-empty and contain no whitespace"
            )));
        }
    }
    Ok(())
}

fn validate_commands(raw: &RawToolFile) -> Result<()> {
    for (name, tool) in raw.tool.iter() {
        if tool.command.trim().is_empty() {
            return Err(CaptureError::ConfigError(format!(
                "tool '{name}' has an empty `command`"
            )));
        }
    }
    Ok(())
}

fn validate_env_keys(raw: &RawToolFile) -> Result<()> {
    let default_keys = raw.default.env.keys().map(|k| ("[default]".to_string(), k));
    let tool_keys = raw
        .tool
        .iter()
        .flat_map(|(name, tool)| tool.env.keys().map(move |k| (format!("tool '{name}'"), k)));

    for (owner, key) in default_keys.chain(tool_keys) {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(CaptureError::ConfigError(format!(
                "{owner} has invalid environment variable name '{key}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<ToolFile> {
        let raw: RawToolFile = toml::from_str(toml_src)?;
        ToolFile::try_from(raw)
    }

    #[test]
    fn rejects_file_without_tools() {
        let err = parse("[default]\nshell = false\n").unwrap_err();
        assert!(matches!(err, CaptureError::ConfigError(msg) if msg.contains("at least one")));
    }

    #[test]
    fn rejects_blank_command() {
        let err = parse("[tool.blank]\ncommand = \"   \"\n").unwrap_err();
        assert!(matches!(err, CaptureError::ConfigError(msg) if msg.contains("empty `command`")));
    }

    #[test]
    fn rejects_tool_name_with_whitespace() {
        let err = parse("[tool.\"two words\"]\ncommand = \"true\"\n").unwrap_err();
        assert!(matches!(err, CaptureError::ConfigError(msg) if msg.contains("two words")));
    }

    #[test]
    fn rejects_env_key_with_equals_sign() {
        let err = parse("[tool.a]\ncommand = \"env\"\nenv = { \"A=B\" = \"c\" }\n").unwrap_err();
        assert!(matches!(err, CaptureError::ConfigError(msg) if msg.contains("A=B")));
    }

    #[test]
    fn accepts_minimal_tool() {
        let tools = parse("[tool.hello]\ncommand = \"echo hello\"\n").unwrap();
        assert_eq!(tools.tool_names().collect::<Vec<_>>(), vec!["hello"]);
    }
}
