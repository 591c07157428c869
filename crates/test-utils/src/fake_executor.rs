use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use pagewright::dag::ScheduledTask;
use pagewright::engine::{RuntimeEvent, TaskOutcome};
use pagewright::errors::Result;
use pagewright::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records every dispatched task, in dispatch order
/// - immediately reports its completion: `Success`, or the failure message
///   configured with [`FakeExecutor::failing`].
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<ScheduledTask>>>,
    failures: HashMap<String, String>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<ScheduledTask>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failures: HashMap::new(),
        }
    }

    /// Make `task` complete with `Failed(message)`.
    pub fn failing(mut self, task: &str, message: &str) -> Self {
        self.failures.insert(task.to_string(), message.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failures = self.failures.clone();

        Box::pin(async move {
            for t in tasks {
                executed.lock().unwrap().push(t.clone());

                let outcome = match failures.get(&t.name) {
                    Some(message) => TaskOutcome::Failed(message.clone()),
                    None => TaskOutcome::Success,
                };
                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}

/// Names of the recorded tasks, in dispatch order.
pub fn executed_names(executed: &Arc<Mutex<Vec<ScheduledTask>>>) -> Vec<String> {
    executed.lock().unwrap().iter().map(|t| t.name.clone()).collect()
}
