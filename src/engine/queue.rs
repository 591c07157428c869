// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use crate::engine::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrive for a task already taking part in the active run.
///
/// Each entry is a batch of task names for a future run. `max_runs` bounds the
/// number of batches kept; when the scheduler goes idle the runtime calls
/// [`TriggerQueue::drain_pending`], which merges every batch into one run.
/// A burst of saves to the same stylesheet therefore causes at most one
/// extra `style` run.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Record a trigger that arrived while the task is running.
    ///
    /// - `Queue`: merge into the last batch (or open one), dropping the
    ///   oldest batches beyond `max_runs`.
    /// - `Cancel`: drop earlier queued triggers of this task only and keep
    ///   the latest one. Other tasks' triggers stay queued, and the running
    ///   task itself is left alone.
    pub fn record_trigger(&mut self, task: &str) {
        let name = task.to_string();

        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                if let Some(last_batch) = self.runs.back_mut() {
                    let inserted = last_batch.insert(name.clone());
                    debug!(task = %name, inserted, "merged trigger into queued batch");
                } else {
                    self.runs.push_back(BTreeSet::from([name.clone()]));
                    debug!(task = %name, "queued trigger for next run");
                }

                if self.runs.len() > self.max_runs {
                    warn!(
                        current_batches = self.runs.len(),
                        max_runs = self.max_runs,
                        "too many queued runs; dropping oldest"
                    );
                    while self.runs.len() > self.max_runs {
                        self.runs.pop_front();
                    }
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                for batch in &mut self.runs {
                    batch.remove(&name);
                }
                self.runs.retain(|batch| !batch.is_empty());
                debug!(task = %name, "replacing queued trigger with latest (cancel mode)");
                match self.runs.back_mut() {
                    Some(last_batch) => {
                        last_batch.insert(name);
                    }
                    None => self.runs.push_back(BTreeSet::from([name])),
                }
            }
        }
    }

    /// Drain every queued batch into one sorted list of task names.
    pub fn drain_pending(&mut self) -> Vec<TaskName> {
        let mut merged: BTreeSet<TaskName> = BTreeSet::new();
        while let Some(batch) = self.runs.pop_front() {
            merged.extend(batch);
        }
        if !merged.is_empty() {
            debug!(drained = merged.len(), "drained queued triggers into new run");
        }
        merged.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_mode_coalesces_repeated_triggers() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 1);
        q.record_trigger("style");
        q.record_trigger("style");
        q.record_trigger("page");
        assert_eq!(q.drain_pending(), vec!["page".to_string(), "style".to_string()]);
        assert!(q.is_empty());
    }

    #[test]
    fn cancel_mode_collapses_per_task() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 1);
        q.record_trigger("style");
        q.record_trigger("script");
        q.record_trigger("style");
        assert_eq!(q.drain_pending(), vec!["script".to_string(), "style".to_string()]);
        assert!(q.is_empty());
    }

    #[test]
    fn zero_length_is_clamped() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 0);
        q.record_trigger("page");
        assert!(!q.is_empty());
    }
}
