// src/exec/backend.rs

//! Pluggable executor backend.
//!
//! The runtime talks to an [`ExecutorBackend`] instead of running tasks
//! itself. Production uses [`RealExecutorBackend`]; tests swap in a fake that
//! records dispatched tasks and completes them immediately.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};
use crate::tasks::TaskContext;

use super::executor_loop::spawn_executor;

pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks. Completion is reported later through a
    /// `RuntimeEvent::TaskCompleted`.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs tasks for real against a [`TaskContext`].
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ScheduledTask>,
}

impl RealExecutorBackend {
    /// Spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, ctx: Arc<TaskContext>) -> Self {
        let tx = spawn_executor(runtime_tx, ctx);
        Self { tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            for task in tasks {
                tx.send(task).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
