// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::ScheduledTask;
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RunReport, RuntimeEvent};

/// Async IO shell around [`CoreRuntime`].
///
/// Reads events from the channel, feeds them to the core and dispatches the
/// resulting tasks to an [`ExecutorBackend`].
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    reports: Vec<RunReport>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            reports: Vec::new(),
        }
    }

    /// Main event loop. Returns the report of every run that finished.
    pub async fn run(mut self) -> Result<Vec<RunReport>> {
        debug!("runtime started");

        loop {
            let Some(event) = self.event_rx.recv().await else {
                debug!("runtime event channel closed; exiting");
                break;
            };

            debug!(?event, "runtime received event");
            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                debug!("core requested exit; stopping runtime");
                break;
            }
        }

        Ok(self.reports)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await?,
            CoreCommand::RunFinished(report) => {
                if report.is_success() {
                    info!(run_id = report.run_id, tasks = ?report.succeeded, "run finished");
                } else {
                    for (task, error) in &report.errors {
                        warn!(run_id = report.run_id, task = %task, "{error}");
                    }
                    warn!(run_id = report.run_id, failed = ?report.failed, "run finished with failures");
                }
                self.reports.push(report);
            }
            CoreCommand::RequestExit => debug!("core issued RequestExit"),
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "dispatching ready tasks");
        self.executor.spawn_ready_tasks(tasks).await
    }
}
