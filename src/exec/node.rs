// src/exec/node.rs

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::changes::ChangeSet;
use crate::fs::FileSystem;
use crate::graph::{ExecutableNode, Task, TaskGraph};
use crate::runner::report::{TaskReport, TaskStatus};

/// Everything a running task needs, shared between the initial build and
/// watch-triggered re-runs.
pub struct BuildContext {
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub changes: Arc<ChangeSet>,
    pub graph: Arc<TaskGraph>,
    workers: Arc<Semaphore>,
    worker_count: usize,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("root", &self.root)
            .field("workers", &self.worker_count)
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// `workers` bounds how many tasks transform concurrently (min 1).
    pub fn new(
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        changes: Arc<ChangeSet>,
        graph: Arc<TaskGraph>,
        workers: usize,
    ) -> Self {
        let worker_count = workers.max(1);
        Self {
            root: root.into(),
            fs,
            changes,
            graph,
            workers: Arc::new(Semaphore::new(worker_count)),
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

/// Reports from one executed subtree, in completion order.
#[derive(Debug, Default)]
pub struct NodeOutcome {
    pub reports: Vec<TaskReport>,
    /// Set when a task failed or a parallel branch panicked.
    pub failed: bool,
}

impl NodeOutcome {
    fn absorb(&mut self, other: NodeOutcome) {
        self.failed |= other.failed;
        self.reports.extend(other.reports);
    }
}

/// Run one task to completion while holding a worker permit.
pub async fn run_leaf(ctx: &BuildContext, task: &Task) -> TaskReport {
    // The semaphore is never closed; without a permit we still run.
    let _permit = ctx.workers.acquire().await.ok();

    let started = Instant::now();
    info!(task = %task.name(), "starting task");

    let result = task.run(ctx.fs.as_ref(), &ctx.root, &ctx.changes).await;
    let duration = started.elapsed();

    match result {
        Ok(output) if output.skipped => {
            info!(task = %task.name(), ?duration, "task skipped (inputs unchanged)");
            TaskReport {
                task: task.name().to_string(),
                status: TaskStatus::Skipped,
                duration,
                bytes: 0,
                files: Vec::new(),
            }
        }
        Ok(output) => {
            let bytes = output.bytes();
            info!(
                task = %task.name(),
                ?duration,
                processed = output.processed,
                files = output.files.len(),
                bytes,
                "task finished"
            );
            TaskReport {
                task: task.name().to_string(),
                status: TaskStatus::Succeeded,
                duration,
                bytes,
                files: output.files,
            }
        }
        Err(err) => {
            error!(task = %task.name(), ?duration, error = %err, "task failed");
            TaskReport {
                task: task.name().to_string(),
                status: TaskStatus::Failed(err),
                duration,
                bytes: 0,
                files: Vec::new(),
            }
        }
    }
}

type NodeFuture = Pin<Box<dyn Future<Output = NodeOutcome> + Send + 'static>>;

/// Execute a resolved tree.
///
/// - `Sequence`: children in order; the first failure stops the sequence.
/// - `Parallel`: children concurrently; every child runs to completion and
///   the group fails if any child failed.
pub fn run_node(ctx: Arc<BuildContext>, node: ExecutableNode) -> NodeFuture {
    Box::pin(async move {
        match node {
            ExecutableNode::Leaf(task) => {
                let report = run_leaf(&ctx, &task).await;
                NodeOutcome {
                    failed: !report.succeeded(),
                    reports: vec![report],
                }
            }
            ExecutableNode::Sequence(children) => {
                let mut outcome = NodeOutcome::default();
                let total = children.len();
                for (idx, child) in children.into_iter().enumerate() {
                    outcome.absorb(run_node(Arc::clone(&ctx), child).await);
                    if outcome.failed {
                        if idx + 1 < total {
                            warn!(
                                skipped = total - idx - 1,
                                "sequence stopped after failure; remaining steps not run"
                            );
                        }
                        break;
                    }
                }
                outcome
            }
            ExecutableNode::Parallel(children) => {
                let mut set = JoinSet::new();
                debug!(branches = children.len(), "starting parallel group");
                for child in children {
                    set.spawn(run_node(Arc::clone(&ctx), child));
                }

                let mut outcome = NodeOutcome::default();
                while let Some(joined) = set.join_next().await {
                    match joined {
                        Ok(child) => outcome.absorb(child),
                        Err(err) => {
                            error!(error = %err, "parallel branch panicked");
                            outcome.failed = true;
                        }
                    }
                }
                outcome
            }
        }
    })
}
