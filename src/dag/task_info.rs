// src/dag/task_info.rs

//! Task metadata and per-run state.

use crate::engine::TaskName;
use crate::types::TaskKind;

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Triggered for this run but waiting on dependencies.
    Pending,
    /// Dispatched to the executor.
    Running,
    DoneSuccess,
    /// Failed in this run, or blocked by a failed dependency.
    DoneFailed,
}

/// Public, read-only view of a task's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not currently participating in this run.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

/// Static task information from the lowered pipeline, plus per-run state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    pub kind: TaskKind,
    /// Direct predecessors in the pipeline graph.
    pub deps: Vec<TaskName>,

    /// Per-run state (None if not participating in the current run).
    pub run_state: Option<RunState>,

    /// Last run ID in which this task succeeded.
    pub last_successful_run: Option<u64>,

    /// Last run ID in which this task failed.
    pub last_failed_run: Option<u64>,
}

impl TaskInfo {
    pub fn new(kind: TaskKind, deps: Vec<TaskName>) -> Self {
        Self {
            name: kind.name().to_string(),
            kind,
            deps,
            run_state: None,
            last_successful_run: None,
            last_failed_run: None,
        }
    }
}

/// A task the scheduler wants the executor to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub kind: TaskKind,
    /// All tasks dispatched within the same run share this id.
    pub run_id: u64,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            kind: info.kind,
            run_id,
        }
    }
}
