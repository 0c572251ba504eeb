// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The watch runtime talks to an `ExecutorBackend` instead of running tasks
//! itself, so tests can record dispatches and emit completions directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::{AssetflowError, Result};
use crate::exec::node::{run_leaf, BuildContext};
use crate::runner::report::{BuildReport, TaskReport, TaskStatus};
use crate::types::TaskName;

pub trait ExecutorBackend: Send {
    /// Start one run of `task`. Must eventually lead to a
    /// `RuntimeEvent::TaskCompleted` for it.
    fn spawn_task(&mut self, task: TaskName) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Wait for runs already started. Called once when the runtime stops.
    fn drain(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {})
    }
}

/// Production backend: runs each task as a single leaf on the Tokio runtime,
/// sharing the build's context (and therefore its change set).
pub struct RealExecutorBackend {
    ctx: Arc<BuildContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    results: Arc<Mutex<Vec<TaskReport>>>,
    show_files: bool,
    in_flight: JoinSet<()>,
}

impl RealExecutorBackend {
    pub fn new(
        ctx: Arc<BuildContext>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        results: Arc<Mutex<Vec<TaskReport>>>,
        show_files: bool,
    ) -> Self {
        Self {
            ctx,
            runtime_tx,
            results,
            show_files,
            in_flight: JoinSet::new(),
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_task(&mut self, task: TaskName) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let leaf = self.ctx.graph.task(&task).cloned().ok_or_else(|| {
                AssetflowError::UnknownComposition(task.clone())
            })?;

            // Reap finished runs so the set does not grow for the whole session.
            while self.in_flight.try_join_next().is_some() {}

            let ctx = Arc::clone(&self.ctx);
            let tx = self.runtime_tx.clone();
            let results = Arc::clone(&self.results);
            let show_files = self.show_files;

            self.in_flight.spawn(async move {
                let report = run_leaf(&ctx, &leaf).await;
                let outcome = match report.status {
                    TaskStatus::Succeeded => TaskOutcome::Succeeded,
                    TaskStatus::Skipped => TaskOutcome::Skipped,
                    TaskStatus::Failed(_) => TaskOutcome::Failed,
                };

                BuildReport {
                    composition: report.task.clone(),
                    duration: report.duration,
                    tasks: vec![report.clone()],
                    ..BuildReport::default()
                }
                .print_summary(show_files);

                match results.lock() {
                    Ok(mut log) => log.push(report),
                    Err(poisoned) => poisoned.into_inner().push(report),
                }

                if let Err(err) = tx
                    .send(RuntimeEvent::TaskCompleted {
                        task: leaf.name().to_string(),
                        outcome,
                    })
                    .await
                {
                    debug!(task = %leaf.name(), "runtime gone before completion was delivered: {err}");
                }
            });
            Ok(())
        })
    }

    fn drain(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            while let Some(joined) = self.in_flight.join_next().await {
                if let Err(err) = joined {
                    error!(error = %err, "task run panicked");
                }
            }
        })
    }
}
