// src/errors.rs

//! Crate-wide error types.
//!
//! [`CaptureError`] covers everything a caller can get back as a `Result`
//! (tool-file loading, CLI argument handling). Failures inside a running
//! capture never surface here; they degrade to events instead (see
//! [`SpawnError`], which is only ever rendered into an error line).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why the launcher could not create a child process.
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("empty command")]
    EmptyCommand,

    #[error("{program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CaptureError>;
