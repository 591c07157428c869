// src/tasks/extra.rs

use tracing::info;

use crate::errors::Result;
use crate::tasks::TaskContext;
use crate::tasks::transform::{FileOutput, transform_each};
use crate::types::TaskKind;

/// Copy the whole `public` tree into `dist` unchanged.
pub fn run(ctx: &TaskContext) -> Result<()> {
    let copied = transform_each(
        ctx,
        TaskKind::Extra,
        &ctx.public_dir(),
        "**",
        &ctx.dist_dir(),
        |src, bytes| Ok(Some(FileOutput::same_path(src, bytes))),
    )?;
    info!(files = copied.len(), "copied public assets");
    Ok(())
}
