// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::pipeline::PipelineGraph;

/// Immutable DAG plus mutable per-run state.
///
/// The scheduler remembers which tasks take part in the current run, decides
/// when a pending task is ready, and fails the dependents of a failed task.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    run_counter: u64,
    current_run_id: Option<u64>,
}

impl Scheduler {
    pub fn from_pipeline(pipeline: &PipelineGraph) -> Self {
        let graph = DagGraph::from_pipeline(pipeline);

        let tasks = pipeline
            .nodes()
            .map(|spec| {
                let name = spec.kind.name().to_string();
                let deps = graph.dependencies_of(&name).to_vec();
                (name, TaskInfo::new(spec.kind, deps))
            })
            .collect();

        Self {
            graph,
            tasks,
            run_counter: 0,
            current_run_id: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    pub fn contains(&self, task: &str) -> bool {
        self.tasks.contains_key(task)
    }

    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Names of tasks taking part in the active run; empty when idle.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }
        self.tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.name.clone())
            .collect()
    }

    /// Tasks that start a full run when triggered.
    pub fn root_tasks(&self) -> Vec<TaskName> {
        self.graph.roots()
    }

    /// Start a new run. Per-run state is reset; success history is kept so
    /// a watch-triggered task can run without re-running its predecessors.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.step_trigger(task).newly_scheduled
    }

    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.step_completion(task, outcome).newly_scheduled
    }

    /// Like [`Scheduler::handle_trigger`] but returns the full [`SchedulerStep`].
    pub fn step_trigger(&mut self, task: &str) -> SchedulerStep {
        if self.current_run_id.is_none() {
            debug!(task = %task, "trigger with no active run; starting a new run");
            self.start_new_run();
        }

        if self.tasks.contains_key(task) {
            let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
            manager.mark_task_and_dependents_pending(task);
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            run_just_finished,
        }
    }

    /// Like [`Scheduler::handle_completion`] but returns the full [`SchedulerStep`].
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::empty();
        };

        let mut newly_scheduled = Vec::new();
        let mut newly_failed = Vec::new();

        match self.tasks.get_mut(task) {
            Some(info) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    info.last_successful_run = Some(run_id);
                    debug!(task = %info.name, run_id, "task completed successfully");
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    newly_scheduled.extend(manager.collect_new_ready_tasks());
                }
                TaskOutcome::Failed(message) => {
                    info.run_state = Some(RunState::DoneFailed);
                    info.last_failed_run = Some(run_id);
                    warn!(
                        task = %info.name,
                        run_id,
                        error = %message,
                        "task failed; failing dependents in this run"
                    );
                    newly_failed.push(info.name.clone());
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    newly_failed.append(&mut manager.mark_dependents_failed(task));
                }
            },
            None => warn!(task = %task, "completion for unknown task; ignoring"),
        }

        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed,
            run_just_finished,
        }
    }

    /// Clear `current_run_id` once every task is terminal. Returns `true` on
    /// the running -> idle transition.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        if manager.all_tasks_terminal() {
            info!(run_id = self.current_run_id, "scheduler: all tasks terminal; run finished");
            self.current_run_id = None;
            true
        } else {
            false
        }
    }
}
