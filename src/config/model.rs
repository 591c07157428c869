// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::TriggerWhileRunningBehaviour;

/// The merged build configuration shared (read-only) by every task.
///
/// This is a direct mapping of `pages.config.toml`:
///
/// ```toml
/// [build]
/// src = "src"
/// dist = "dist"
/// temp = "temp"
/// public = "public"
///
/// [build.paths]
/// styles = "assets/styles/*.scss"
/// scripts = "assets/scripts/*.js"
/// pages = "*.html"
/// images = "assets/images/**"
/// fonts = "assets/fonts/**"
///
/// [data]
/// title = "My site"
/// ```
///
/// Top-level tables are merged shallowly with the defaults, see
/// [`crate::config::loader::merge_shallow`].
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// Directory layout and source globs. Every field is required once the
    /// table is present.
    pub build: BuildSection,

    /// Variables injected into page templates.
    #[serde(default)]
    pub data: toml::Table,

    /// Dev server settings from `[server]`.
    #[serde(default)]
    pub server: ServerSection,

    /// Transform settings from `[tools]`.
    #[serde(default)]
    pub tools: ToolsSection,
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    pub src: PathBuf,
    pub dist: PathBuf,
    pub temp: PathBuf,
    pub public: PathBuf,
    pub paths: PathsSection,
}

/// `[build.paths]`: one glob per source category, relative to `build.src`.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    pub styles: String,
    pub scripts: String,
    pub pages: String,
    pub images: String,
    pub fonts: String,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Port of the live-reload WebSocket.
    #[serde(default = "default_reload_port")]
    pub reload_port: u16,

    /// URL prefix -> directory (relative to the working directory). Checked
    /// before the static roots.
    #[serde(default = "default_routes")]
    pub routes: BTreeMap<String, PathBuf>,

    /// What to do with a watch trigger for a task that is already running.
    #[serde(default)]
    pub while_busy: TriggerWhileRunningBehaviour,

    /// Skip a rebuild when the watched files hash to the same value as the
    /// last time the task was triggered.
    #[serde(default = "default_use_hash")]
    pub use_hash: bool,
}

fn default_port() -> u16 {
    8080
}

fn default_reload_port() -> u16 {
    35729
}

fn default_routes() -> BTreeMap<String, PathBuf> {
    let mut routes = BTreeMap::new();
    routes.insert("/node_modules".to_string(), PathBuf::from("node_modules"));
    routes
}

fn default_use_hash() -> bool {
    true
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            reload_port: default_reload_port(),
            routes: default_routes(),
            while_busy: TriggerWhileRunningBehaviour::default(),
            use_hash: default_use_hash(),
        }
    }
}

/// Output style handed to the Sass compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StyleOutput {
    #[default]
    Expanded,
    Compressed,
}

/// `[tools]` section.
///
/// Each optional command replaces the built-in transform for that task. The
/// command receives a source file on stdin and must print the result on
/// stdout, e.g. `style = "sass --stdin --style=expanded"`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub image: Option<String>,

    /// ECMAScript version scripts are lowered to.
    #[serde(default = "default_script_target")]
    pub script_target: String,

    #[serde(default)]
    pub style_output: StyleOutput,
}

fn default_script_target() -> String {
    "es2015".to_string()
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            style: None,
            script: None,
            page: None,
            image: None,
            script_target: default_script_target(),
            style_output: StyleOutput::default(),
        }
    }
}

impl BuildConfig {
    /// `<root>/<build.src>`
    pub fn src_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.build.src)
    }

    /// `<root>/<build.dist>`
    pub fn dist_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.build.dist)
    }

    /// `<root>/<build.temp>`
    pub fn temp_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.build.temp)
    }

    /// `<root>/<build.public>`
    pub fn public_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.build.public)
    }
}
