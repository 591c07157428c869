// src/config/mod.rs

//! Configuration loading and validation for pagewright.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Merge an optional override file over the built-in defaults (`loader.rs`).
//! - Validate directory and glob invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    ConfigSource, DEFAULT_CONFIG_FILE, LoadedConfig, load_config, load_from_str,
    resolve_config_path,
};
pub use model::{BuildConfig, BuildSection, PathsSection, ServerSection, StyleOutput, ToolsSection};
pub use validate::validate_config;
