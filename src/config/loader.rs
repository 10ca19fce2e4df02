// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawToolFile, ToolFile};
use crate::errors::Result;

/// Load a tool file from a given path and return the raw `RawToolFile`.
///
/// This only performs TOML deserialization; it does **not** validate. Use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawToolFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawToolFile = toml::from_str(&contents)?;

    Ok(raw)
}

/// Load a tool file, validate it, and resolve relative `cwd` entries
/// against the file's directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ToolFile> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    let mut tools = ToolFile::try_from(raw)?;

    let base = config_root_dir(path);
    for (name, tool) in tools.tool.iter_mut() {
        if let Some(cwd) = tool.cwd.take() {
            let resolved = if cwd.is_relative() { base.join(cwd) } else { cwd };
            debug!(tool = %name, cwd = %resolved.display(), "resolved tool working directory");
            tool.cwd = Some(resolved);
        }
    }

    Ok(tools)
}

/// Directory relative paths in a tool file are resolved against.
///
/// A bare filename like `Tools.toml` has an empty parent; that means the
/// current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
