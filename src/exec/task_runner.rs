// src/exec/task_runner.rs

//! Runs one scheduled task on the blocking pool and reports its outcome.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::tasks::{self, TaskContext};

/// Run `task` and send exactly one `TaskCompleted` for it.
///
/// Tasks do synchronous file and library work, so they run under
/// `spawn_blocking`. A panic inside a task is reported as a failure.
pub async fn run_task(
    task: ScheduledTask,
    ctx: Arc<TaskContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let started = Instant::now();
    let kind = task.kind;

    let joined = tokio::task::spawn_blocking(move || tasks::run(kind, &ctx)).await;

    let outcome = match joined {
        Ok(Ok(())) => {
            info!(
                task = %task.name,
                run_id = task.run_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "task finished"
            );
            TaskOutcome::Success
        }
        Ok(Err(err)) => TaskOutcome::Failed(format!("{err:#}")),
        Err(join_err) => {
            error!(task = %task.name, run_id = task.run_id, error = %join_err, "task panicked");
            TaskOutcome::Failed(format!("task panicked: {join_err}"))
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        error!(task = %task.name, "runtime gone; dropping completion");
    }
}
