use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use assetflow::engine::{RuntimeEvent, TaskOutcome};
use assetflow::errors::Result;
use assetflow::exec::ExecutorBackend;
use assetflow::types::TaskName;

/// Executor backend for runtime tests.
///
/// Every dispatched task name is appended to the shared `executed` log. By
/// default the run "finishes" immediately with `outcome`; after
/// [`FakeExecutor::manual`] the test delivers `TaskCompleted` itself.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<TaskName>>>,
    outcome: Option<TaskOutcome>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<TaskName>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            outcome: Some(TaskOutcome::Succeeded),
        }
    }

    /// Report `outcome` for every run instead of `Succeeded`.
    pub fn completing_with(mut self, outcome: TaskOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Never report completions; runs stay in flight until the test says so.
    pub fn manual(mut self) -> Self {
        self.outcome = None;
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_task(&mut self, task: TaskName) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.executed.lock().unwrap().push(task.clone());

        let Some(outcome) = self.outcome else {
            return Box::pin(async { Ok(()) });
        };
        let tx = self.runtime_tx.clone();
        Box::pin(async move {
            tx.send(RuntimeEvent::TaskCompleted { task, outcome })
                .await
                .map_err(anyhow::Error::from)?;
            Ok(())
        })
    }
}
