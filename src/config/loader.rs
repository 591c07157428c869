// src/config/loader.rs

use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::{debug, info};

use crate::config::model::BuildConfig;
use crate::config::validate::validate_config;
use crate::errors::{PagesError, Result};
use crate::fs::FileSystem;

/// File name looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "pages.config.toml";

/// Built-in configuration. Override files are merged on top of this table.
pub const DEFAULT_CONFIG_TOML: &str = r#"
[build]
src = "src"
dist = "dist"
temp = "temp"
public = "public"

[build.paths]
styles = "assets/styles/*.scss"
scripts = "assets/scripts/*.js"
pages = "*.html"
images = "assets/images/**"
fonts = "assets/fonts/**"
"#;

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// No override file exists; built-in defaults are used.
    Defaults,
    /// The override file at this path was merged over the defaults.
    Override(PathBuf),
}

/// A validated configuration plus its provenance.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: BuildConfig,
    pub source: ConfigSource,
}

/// Parse the built-in defaults as a raw table.
pub fn default_table() -> Result<Table> {
    Ok(toml::from_str::<Table>(DEFAULT_CONFIG_TOML)?)
}

/// The built-in configuration, without any override.
pub fn defaults() -> Result<BuildConfig> {
    from_table(default_table()?)
}

/// Shallow merge: each top-level key of `overrides` replaces the key of the
/// same name in `defaults` wholesale. Nested tables are not merged, so an
/// override that provides `[build]` drops every default `build.*` value,
/// `build.paths` included.
pub fn merge_shallow(mut defaults: Table, overrides: Table) -> Table {
    for (key, value) in overrides {
        defaults.insert(key, value);
    }
    defaults
}

/// Deserialize and validate a fully merged table.
pub fn from_table(table: Table) -> Result<BuildConfig> {
    let config: BuildConfig = Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| PagesError::Config(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Merge an override document (TOML text) over the defaults.
pub fn load_from_str(contents: &str) -> Result<BuildConfig> {
    let overrides = toml::from_str::<Table>(contents)?;
    from_table(merge_shallow(default_table()?, overrides))
}

/// Load the configuration for a run.
///
/// - `path` absent: defaults, no error.
/// - `path` present but unreadable or invalid: an error naming the file. It
///   is never downgraded to the defaults.
pub fn load_config(fs: &dyn FileSystem, path: &Path) -> Result<LoadedConfig> {
    if !fs.exists(path) {
        debug!(?path, "no override config; using defaults");
        return Ok(LoadedConfig {
            config: defaults()?,
            source: ConfigSource::Defaults,
        });
    }

    let contents = fs
        .read_to_string(path)
        .map_err(|e| PagesError::Config(format!("reading {}: {e:#}", path.display())))?;

    let config = load_from_str(&contents)
        .map_err(|e| PagesError::Config(format!("{}: {e}", path.display())))?;

    info!(?path, "loaded override config");
    Ok(LoadedConfig {
        config,
        source: ConfigSource::Override(path.to_path_buf()),
    })
}

/// Resolve the config path for a working directory.
///
/// An explicit path is taken relative to `root` unless absolute.
pub fn resolve_config_path(root: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => root.join(p),
        None => root.join(DEFAULT_CONFIG_FILE),
    }
}
