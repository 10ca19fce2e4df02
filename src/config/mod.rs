// src/config/mod.rs

//! Tool-definition files.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a tool file from disk (`loader.rs`).
//! - Validate it and resolve relative working directories (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{DefaultSection, RawToolFile, ToolConfig, ToolFile};
