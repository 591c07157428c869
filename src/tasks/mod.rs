// src/tasks/mod.rs

//! The units of work a pipeline is made of.
//!
//! Every task is a function of a shared [`TaskContext`]: it reads sources
//! through the context's file system, delegates the actual transformation to
//! a library (or a `[tools]` command) and writes into `temp` or `dist`.

pub mod clean;
pub mod extra;
pub mod image;
pub mod minify;
pub mod page;
pub mod script;
pub mod sources;
pub mod style;
pub mod transform;
pub mod useref;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info_span;

use crate::config::BuildConfig;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::server::{DevHooks, Reloader};
use crate::types::TaskKind;

/// Everything a task may touch. Shared by all tasks of a pipeline.
pub struct TaskContext {
    pub config: Arc<BuildConfig>,
    /// Working directory every configured path is relative to.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    /// Live-reload broadcaster; a no-op until browsers connect.
    pub reloader: Reloader,
    /// Present only for `develop`; the `server` task needs it.
    pub dev: Option<DevHooks>,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("root", &self.root)
            .field("develop", &self.dev.is_some())
            .finish_non_exhaustive()
    }
}

impl TaskContext {
    pub fn new(config: Arc<BuildConfig>, root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            config,
            root: root.into(),
            fs,
            reloader: Reloader::new(),
            dev: None,
        }
    }

    pub fn with_dev(mut self, dev: DevHooks) -> Self {
        self.dev = Some(dev);
        self
    }

    pub fn src_dir(&self) -> PathBuf {
        self.config.src_dir(&self.root)
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.config.dist_dir(&self.root)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.config.temp_dir(&self.root)
    }

    pub fn public_dir(&self) -> PathBuf {
        self.config.public_dir(&self.root)
    }

    /// Run an external `[tools]` command from the working directory.
    pub(crate) fn pipe_through(&self, cmd: &str, input: &[u8], file: &Path) -> anyhow::Result<Vec<u8>> {
        crate::exec::command::pipe_through(cmd, input, &self.root, file)
    }
}

/// Run one task to completion.
pub fn run(kind: TaskKind, ctx: &TaskContext) -> Result<()> {
    let _span = info_span!("task", task = %kind).entered();
    match kind {
        TaskKind::Clean => clean::run(ctx),
        TaskKind::Style => style::run(ctx),
        TaskKind::Script => script::run(ctx),
        TaskKind::Page => page::run(ctx),
        TaskKind::Image => image::run_images(ctx),
        TaskKind::Font => image::run_fonts(ctx),
        TaskKind::Extra => extra::run(ctx),
        TaskKind::Useref => useref::run(ctx),
        TaskKind::Server => crate::server::start(ctx),
    }
}
