// src/tasks/page.rs

use std::collections::BTreeMap;
use std::error::Error as _;

use anyhow::anyhow;
use tera::{Context, Tera};
use tracing::info;

use crate::errors::{PagesError, Result};
use crate::tasks::TaskContext;
use crate::tasks::sources::{self, SourceFile};
use crate::tasks::transform::{FileOutput, transform_each};
use crate::types::TaskKind;

/// Every HTML file under `src` is registered, so pages can `extends` or
/// `include` layouts that the pages glob itself does not render.
const TEMPLATE_GLOB: &str = "**/*.html";

/// Render page templates from `src` with `[data]` into `temp`.
pub fn run(ctx: &TaskContext) -> Result<()> {
    let written = match ctx.config.tools.page.as_deref() {
        Some(cmd) => transform_each(
            ctx,
            TaskKind::Page,
            &ctx.src_dir(),
            &ctx.config.build.paths.pages,
            &ctx.temp_dir(),
            |src, input| Ok(Some(FileOutput::same_path(src, ctx.pipe_through(cmd, &input, &src.abs)?))),
        )?,
        None => {
            // Fresh registry per run: edits to layouts show up on the next build.
            let tera = load_templates(ctx)?;
            let context = Context::from_serialize(&ctx.config.data)
                .map_err(|e| PagesError::Config(format!("[data] is not usable as template context: {e}")))?;

            transform_each(
                ctx,
                TaskKind::Page,
                &ctx.src_dir(),
                &ctx.config.build.paths.pages,
                &ctx.temp_dir(),
                |src, _input| {
                    let html = tera
                        .render(&src.rel_str(), &context)
                        .map_err(|e| anyhow!(error_chain(&e)))?;
                    Ok(Some(FileOutput::same_path(src, html)))
                },
            )?
        }
    };

    info!(files = written.len(), "rendered pages");
    Ok(())
}

fn load_templates(ctx: &TaskContext) -> Result<Tera> {
    let src = ctx.src_dir();
    let fs = ctx.fs.as_ref();

    // Pages are registered too, whatever extension the pages glob uses.
    let mut files: BTreeMap<String, SourceFile> = BTreeMap::new();
    for pattern in [TEMPLATE_GLOB, ctx.config.build.paths.pages.as_str()] {
        for file in sources::collect(fs, &src, pattern)? {
            files.entry(file.rel_str()).or_insert(file);
        }
    }

    let mut templates = Vec::with_capacity(files.len());
    for (name, file) in &files {
        templates.push((name.clone(), fs.read_to_string(&file.abs)?));
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates)
        .map_err(|e| PagesError::transform(TaskKind::Page.name(), &src, error_chain(&e)))?;
    Ok(tera)
}

/// Tera puts the useful detail (line, column, missing variable) in the
/// source chain rather than the top-level message.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
