// src/dag/scheduler_step.rs

use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;

/// Result of a single scheduler step.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready to run.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks newly marked failed: the failed task first, then blocked
    /// dependents.
    pub newly_failed: Vec<TaskName>,
    /// Whether this step finished the current run.
    pub run_just_finished: bool,
}

impl SchedulerStep {
    pub fn empty() -> Self {
        Self::default()
    }
}
