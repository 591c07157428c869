// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskName;

pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            current_run_id,
        }
    }

    /// Include a triggered task and all its downstream dependents in this run.
    ///
    /// Tasks not yet in the run become `Pending`; tasks already in the run
    /// keep their state.
    pub fn mark_task_and_dependents_pending(&mut self, root: &str) {
        let mut stack: Vec<TaskName> = vec![root.to_string()];
        let mut visited: HashSet<TaskName> = HashSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            if let Some(info) = self.tasks.get_mut(&name) {
                if info.run_state.is_none() {
                    info.run_state = Some(RunState::Pending);
                    debug!(task = %info.name, "marked Pending for this run");
                }
                stack.extend(self.graph.dependents_of(&name).iter().cloned());
            } else {
                warn!(task = %name, "node in DAG not present in tasks map");
            }
        }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        ReadOnlyStateManager::new(self.tasks).deps_satisfied_for_info(info)
    }

    /// Mark all participating dependents of a failed task as `DoneFailed`.
    ///
    /// Returns the newly failed tasks, excluding `failed_task` itself.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut newly_failed = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name)
                && matches!(info.run_state, Some(RunState::Pending | RunState::Running))
            {
                info.run_state = Some(RunState::DoneFailed);
                debug!(task = %info.name, "upstream failed; marking DoneFailed");
                newly_failed.push(info.name.clone());
                stack.extend(self.graph.dependents_of(&name).iter().cloned());
            }
        }

        newly_failed
    }

    /// Move every `Pending` task whose dependencies are satisfied to
    /// `Running` and return them for dispatch.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let mut candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| {
                matches!(info.run_state, Some(RunState::Pending))
                    && self.deps_satisfied_for_info(info)
            })
            .map(|info| info.name.clone())
            .collect();
        // Stable dispatch order keeps logs and tests deterministic.
        candidates.sort();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                let is_rerun = info.last_successful_run.is_some() || info.last_failed_run.is_some();
                if is_rerun {
                    info!(task = %info.name, run_id = self.current_run_id, "re-running task");
                } else {
                    info!(task = %info.name, run_id = self.current_run_id, "starting task");
                }

                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(
                    info,
                    self.current_run_id.unwrap_or(0),
                ));
            }
        }

        ready
    }

    pub fn all_tasks_terminal(&self) -> bool {
        !self
            .tasks
            .values()
            .any(|info| matches!(info.run_state, Some(RunState::Pending | RunState::Running)))
    }
}

/// Shared-reference view used for dependency checks.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// A dependency is satisfied when it succeeded in this run, or when it is
    /// not part of this run and succeeded in an earlier one.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| {
            let Some(dep) = self.tasks.get(dep_name) else {
                warn!(task = %info.name, dep = %dep_name, "dependency missing from tasks map");
                return false;
            };
            match dep.run_state {
                Some(RunState::DoneSuccess) => true,
                Some(RunState::DoneFailed | RunState::Pending | RunState::Running) => false,
                None => dep.last_successful_run.is_some(),
            }
        })
    }
}
