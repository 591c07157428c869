// src/exec/executor_loop.rs

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::exec::task_runner::run_task;
use crate::tasks::TaskContext;

/// Spawn the background executor loop.
///
/// Every scheduled task runs in its own Tokio task, so siblings the scheduler
/// releases together overlap. The scheduler never dispatches a task that is
/// already running within the same pipeline.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    ctx: Arc<TaskContext>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        debug!("executor loop started");
        while let Some(task) = rx.recv().await {
            let runtime_tx = runtime_tx.clone();
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                run_task(task, ctx, runtime_tx).await;
            });
        }
        debug!("executor loop finished (channel closed)");
    });

    tx
}
