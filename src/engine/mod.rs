// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the DAG scheduler
//! - the trigger queue (what happens when triggers arrive while a run is active)
//! - the runtime event loop reacting to start-up triggers, file-watch
//!   triggers, task completions and shutdown
//!
//! The pure state machine lives in [`core`]; the async shell in [`runtime`].

use std::fmt;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of one task invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The task returned an error; the message is the rendered error chain.
    Failed(String),
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Seeded when a pipeline starts.
    Startup,
    /// A watched file changed.
    FileWatch,
}

#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Exit once the DAG is idle and no triggers are queued. Set for
    /// one-shot pipelines (`clean`, `build`, the initial `develop` run).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the CLI, watchers and executors.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Summary of one finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: u64,
    /// Tasks that completed successfully, in completion order.
    pub succeeded: Vec<TaskName>,
    /// Tasks that failed, plus dependents blocked by them.
    pub failed: Vec<TaskName>,
    /// Error message of each task that itself failed.
    pub errors: Vec<(TaskName, String)>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {}: {} succeeded, {} failed",
            self.run_id,
            self.succeeded.len(),
            self.failed.len()
        )
    }
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use crate::types::TriggerWhileRunningBehaviour;
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
