// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::debug;

use crate::dag::{ScheduledTask, Scheduler, TaskRunState};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunReport, RuntimeOptions, TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, executed by the IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// A run reached a terminal state.
    RunFinished(RunReport),
    /// Stop the runtime (one-shot pipelines once idle).
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a task trigger.
///
/// - Idle scheduler: start a new run seeded with this trigger plus anything
///   already queued.
/// - Active run, task not in it: merge the task into the active run so
///   unrelated roots share a run id and run in parallel.
/// - Active run, task already in it: record the trigger in the queue for a
///   future run (queue/cancel semantics).
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    report: &mut RunReport,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    debug!(task = %task, ?reason, "trigger received");

    if scheduler.is_idle() {
        let mut triggers: BTreeSet<TaskName> = queue.drain_pending().into_iter().collect();
        triggers.insert(task);
        let commands = start_new_run_from_triggers(
            scheduler,
            report,
            triggers.into_iter().collect(),
        );
        return CoreStep::continue_with(commands);
    }

    let mut commands = Vec::new();
    match scheduler.run_state_of(&task) {
        None => {
            debug!(task = %task, "trigger for task outside this pipeline; ignoring");
        }
        Some(TaskRunState::NotInRun) => {
            let newly_ready = scheduler.handle_trigger(&task);
            if !newly_ready.is_empty() {
                commands.push(CoreCommand::DispatchTasks(newly_ready));
            }
        }
        Some(_already_in_run) => {
            queue.record_trigger(&task);
        }
    }

    CoreStep::continue_with(commands)
}

/// Handle a task completion.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    report: &mut RunReport,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let known = scheduler.contains(&task) && !scheduler.is_idle();
    let error = match &outcome {
        TaskOutcome::Failed(message) => Some(message.clone()),
        TaskOutcome::Success => None,
    };

    let step = scheduler.step_completion(&task, outcome);

    if known {
        match error {
            Some(message) => report.errors.push((task, message)),
            None => report.succeeded.push(task),
        }
        report.failed.extend(step.newly_failed);
    }

    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }
    if step.run_just_finished {
        commands.push(CoreCommand::RunFinished(std::mem::take(report)));
    }

    commands.extend(maybe_start_queued_run(scheduler, queue, report));

    let mut keep_running = true;
    if options.exit_when_idle && scheduler.is_idle() && queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

/// Seed a new run from a set of triggers. Pure: returns the commands.
pub fn start_new_run_from_triggers(
    scheduler: &mut Scheduler,
    report: &mut RunReport,
    triggers: Vec<TaskName>,
) -> Vec<CoreCommand> {
    if triggers.is_empty() {
        return Vec::new();
    }

    scheduler.start_new_run();
    *report = RunReport {
        run_id: scheduler.current_run_id().unwrap_or(0),
        ..RunReport::default()
    };

    let mut all_ready = Vec::new();
    for task in triggers {
        all_ready.extend(scheduler.handle_trigger(&task));
    }

    if all_ready.is_empty() {
        Vec::new()
    } else {
        vec![CoreCommand::DispatchTasks(all_ready)]
    }
}

fn maybe_start_queued_run(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    report: &mut RunReport,
) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }
    let triggers = queue.drain_pending();
    start_new_run_from_triggers(scheduler, report, triggers)
}
