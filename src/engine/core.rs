// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`RuntimeEvent`]s and returns the commands the IO shell
//! should carry out. It owns no channels and no Tokio types, so its semantics
//! are unit tested without an async runtime.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{CoreStep, handle_task_completion, handle_task_trigger};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunReport, RuntimeEvent, RuntimeOptions};
use crate::types::TriggerWhileRunningBehaviour;

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
    report: RunReport,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
            report: RunReport::default(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Handle one event and return the resulting commands.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => handle_task_trigger(
                &mut self.scheduler,
                &mut self.queue,
                &mut self.report,
                task,
                reason,
            ),
            RuntimeEvent::TaskCompleted { task, outcome } => handle_task_completion(
                &mut self.scheduler,
                &mut self.queue,
                &mut self.report,
                &self.options,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
