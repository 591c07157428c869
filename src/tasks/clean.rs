// src/tasks/clean.rs

use tracing::{debug, info};

use crate::errors::Result;
use crate::tasks::TaskContext;

/// Remove `dist` and `temp`. Missing directories are not an error, so running
/// twice in a row always succeeds.
pub fn run(ctx: &TaskContext) -> Result<()> {
    for dir in [ctx.dist_dir(), ctx.temp_dir()] {
        if ctx.fs.remove_dir_all(&dir)? {
            info!(path = ?dir, "removed");
        } else {
            debug!(path = ?dir, "nothing to remove");
        }
    }
    Ok(())
}
