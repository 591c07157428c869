// src/tasks/transform.rs

//! Per-file read -> transform -> write driver shared by the file tasks.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{PagesError, Result};
use crate::tasks::TaskContext;
use crate::tasks::sources::{SourceFile, SourceWalk};
use crate::types::TaskKind;

/// Result of transforming one source file.
#[derive(Debug)]
pub struct FileOutput {
    /// Output path relative to the destination directory.
    pub rel: PathBuf,
    pub bytes: Vec<u8>,
}

impl FileOutput {
    /// Same relative path as the source.
    pub fn same_path(src: &SourceFile, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            rel: src.rel.clone(),
            bytes: bytes.into(),
        }
    }
}

/// Stream every file matching `pattern` under `base` through `transform` and
/// write the results under `dest`.
///
/// Each file is read, transformed and written before the next is listed. The
/// first failure stops the task and is reported against that source file.
/// `transform` returning `None` skips the file (e.g. Sass partials).
///
/// Returns the written paths relative to `dest`. For tasks that write into
/// the dev server's roots they are also announced to live-reload clients.
pub fn transform_each<F>(
    ctx: &TaskContext,
    kind: TaskKind,
    base: &Path,
    pattern: &str,
    dest: &Path,
    mut transform: F,
) -> Result<Vec<PathBuf>>
where
    F: FnMut(&SourceFile, Vec<u8>) -> anyhow::Result<Option<FileOutput>>,
{
    let fs = ctx.fs.as_ref();
    let mut written = Vec::new();

    for source in SourceWalk::new(fs, base, pattern)? {
        let source = source?;
        let input = fs.read(&source.abs)?;

        let output = transform(&source, input)
            .map_err(|e| PagesError::transform(kind.name(), &source.rel, format!("{e:#}")))?;

        let Some(output) = output else {
            debug!(task = %kind, path = %source.rel_str(), "skipped");
            continue;
        };

        let target = dest.join(&output.rel);
        fs.write(&target, &output.bytes)?;
        debug!(task = %kind, from = %source.rel_str(), to = ?target, "wrote");
        written.push(output.rel);
    }

    if kind.reloads_after_write() {
        ctx.reloader.reload(&written);
    }
    Ok(written)
}
