// src/runner/mod.rs

//! Build entry point: execute compositions, clean output directories, and
//! run the watch session.

pub mod clean;
pub mod report;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::changes::ChangeSet;
use crate::config::model::ConfigFile;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, TriggerReason};
use crate::errors::{AssetflowError, Result};
use crate::exec::{run_node, BuildContext, ExecutorBackend, RealExecutorBackend};
use crate::fs::FileSystem;
use crate::graph::TaskGraph;
use crate::watch::{spawn_watchers, WatcherHandle};

pub use clean::clean_dir;
pub use report::{BuildReport, CleanReport, TaskReport, TaskStatus};

const RUNTIME_CHANNEL_CAPACITY: usize = 64;

/// Tunables taken from `[config]`.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub workers: usize,
    pub debounce: Duration,
    pub show_files: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            debounce: crate::config::model::DEFAULT_DEBOUNCE,
            show_files: false,
        }
    }
}

impl BuildOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            workers: cfg.config.workers.unwrap_or_else(default_workers),
            debounce: cfg.debounce(),
            show_files: cfg.config.show_files,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Lifecycle of the most recent `execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

struct WatchSession {
    watcher: Option<WatcherHandle>,
    event_tx: mpsc::Sender<RuntimeEvent>,
    runtime: JoinHandle<Result<()>>,
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.watcher.take();
        if !self.runtime.is_finished() {
            self.runtime.abort();
        }
    }
}

/// Runs compositions against one project root.
///
/// The change set and task graph are shared by every run, including the
/// re-runs triggered in watch mode.
pub struct BuildRunner {
    ctx: Arc<BuildContext>,
    options: BuildOptions,
    state: RunState,
    results: Arc<Mutex<Vec<TaskReport>>>,
    watch: Option<WatchSession>,
}

impl fmt::Debug for BuildRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildRunner")
            .field("root", &self.ctx.root)
            .field("state", &self.state)
            .field("watching", &self.watch.is_some())
            .finish_non_exhaustive()
    }
}

impl BuildRunner {
    pub fn new(
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        changes: Arc<ChangeSet>,
        graph: Arc<TaskGraph>,
        options: BuildOptions,
    ) -> Self {
        let ctx = BuildContext::new(root, fs, changes, graph, options.workers);
        Self {
            ctx: Arc::new(ctx),
            options,
            state: RunState::Idle,
            results: Arc::new(Mutex::new(Vec::new())),
            watch: None,
        }
    }

    pub fn context(&self) -> &Arc<BuildContext> {
        &self.ctx
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.ctx.graph
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    fn results_log(&self) -> MutexGuard<'_, Vec<TaskReport>> {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every task report produced so far, initial build and watch re-runs
    /// alike, in completion order.
    pub fn results(&self) -> Vec<TaskReport> {
        self.results_log().clone()
    }

    /// Execute a composition (or a single task) by name.
    ///
    /// `clean` directories of the composition are removed first. Task
    /// failures do not make this return `Err`; they are in the report.
    pub async fn execute(&mut self, name: &str) -> Result<BuildReport> {
        let node = self.ctx.graph.resolve(name)?;
        let clean_dirs: Vec<PathBuf> = self
            .ctx
            .graph
            .composition(name)
            .map(|c| c.clean.clone())
            .unwrap_or_default();

        self.state = RunState::Running;
        let started = Instant::now();
        info!(composition = %name, plan = %node.describe(), "executing");

        let mut cleaned = Vec::with_capacity(clean_dirs.len());
        for dir in &clean_dirs {
            let step = self
                .clean(dir)
                .and_then(|report| self.forget_cleaned_outputs(&report).map(|()| report));
            match step {
                Ok(report) => cleaned.push(report),
                Err(err) => {
                    self.state = RunState::Failed;
                    return Err(err);
                }
            }
        }

        let outcome = run_node(Arc::clone(&self.ctx), node).await;

        self.results_log().extend(outcome.reports.iter().cloned());

        let report = BuildReport {
            composition: name.to_string(),
            cleaned,
            tasks: outcome.reports,
            duration: started.elapsed(),
        };

        self.state = if outcome.failed || !report.succeeded() {
            RunState::Failed
        } else {
            RunState::Succeeded
        };
        info!(
            composition = %name,
            state = ?self.state,
            duration = ?report.duration,
            "execution finished"
        );

        Ok(report)
    }

    /// Remove `dir` (relative to the project root) recursively.
    pub fn clean(&self, dir: impl AsRef<Path>) -> Result<CleanReport> {
        clean_dir(self.ctx.fs.as_ref(), &self.ctx.root, dir.as_ref())
    }

    /// Drop the change records of every task whose outputs lived under the
    /// cleaned directory, so their next run rebuilds from scratch.
    fn forget_cleaned_outputs(&self, report: &CleanReport) -> Result<()> {
        let cleaned = normalized(&report.dir);
        for task in self.ctx.graph.tasks() {
            let dest = normalized(&task.spec().dest);
            if dest.starts_with(&cleaned) || cleaned.starts_with(&dest) {
                debug!(task = %task.name(), dir = ?report.dir, "forgetting cleaned outputs");
                self.ctx.changes.forget(task.name())?;
            }
        }
        Ok(())
    }

    /// Start watching the tasks of `name` with real `notify` watchers and
    /// the production executor.
    pub fn start_watch(&mut self, name: &str) -> Result<()> {
        let bindings = self.ctx.graph.watch_bindings_for(name)?;
        debug!(composition = name, bindings = bindings.len(), "watch bindings selected");
        let (event_tx, event_rx) = mpsc::channel(RUNTIME_CHANNEL_CAPACITY);
        let executor = RealExecutorBackend::new(
            Arc::clone(&self.ctx),
            event_tx.clone(),
            Arc::clone(&self.results),
            self.options.show_files,
        );
        let watcher = spawn_watchers(
            self.ctx.root.clone(),
            bindings,
            self.options.debounce,
            event_tx.clone(),
        )?;
        self.start_watch_session(Some(watcher), event_tx, event_rx, executor)
    }

    /// Start the watch runtime with a custom executor and no filesystem
    /// watchers; triggers arrive through [`BuildRunner::trigger`].
    pub fn start_watch_with<E>(&mut self, executor: E) -> Result<mpsc::Sender<RuntimeEvent>>
    where
        E: ExecutorBackend + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel(RUNTIME_CHANNEL_CAPACITY);
        self.start_watch_session(None, event_tx.clone(), event_rx, executor)?;
        Ok(event_tx)
    }

    fn start_watch_session<E>(
        &mut self,
        watcher: Option<WatcherHandle>,
        event_tx: mpsc::Sender<RuntimeEvent>,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
    ) -> Result<()>
    where
        E: ExecutorBackend + 'static,
    {
        if self.watch.is_some() {
            return Err(AssetflowError::ConfigError(
                "watch mode is already running".to_string(),
            ));
        }

        let core = CoreRuntime::new(self.ctx.graph.task_names().map(str::to_string));
        let runtime = tokio::spawn(Runtime::new(core, event_rx, executor).run());

        info!(
            debounce = ?self.options.debounce,
            "watch mode started"
        );
        self.watch = Some(WatchSession {
            watcher,
            event_tx,
            runtime,
        });
        Ok(())
    }

    /// Ask the watch runtime to run `task` as if one of its watched files
    /// had changed.
    pub async fn trigger(&self, task: &str) -> Result<()> {
        let Some(session) = &self.watch else {
            return Err(AssetflowError::ConfigError(
                "watch mode is not running".to_string(),
            ));
        };
        session
            .event_tx
            .send(RuntimeEvent::TaskTriggered {
                task: task.to_string(),
                reason: TriggerReason::Manual,
            })
            .await
            .map_err(|e| AssetflowError::Other(anyhow::anyhow!("watch runtime stopped: {e}")))
    }

    /// Stop watching: release the watchers, let running tasks finish, and
    /// wait for the runtime to exit. A no-op when not watching.
    pub async fn shutdown(&mut self) {
        let Some(mut session) = self.watch.take() else {
            return;
        };

        // No new filesystem events past this point.
        session.watcher.take();

        if session
            .event_tx
            .send(RuntimeEvent::ShutdownRequested)
            .await
            .is_err()
        {
            debug!("watch runtime already stopped");
        }

        match (&mut session.runtime).await {
            Ok(Ok(())) => info!("watch mode stopped"),
            Ok(Err(err)) => error!(error = %err, "watch runtime failed"),
            Err(err) if err.is_cancelled() => {}
            Err(err) => warn!(error = %err, "watch runtime panicked"),
        }
    }
}

/// `path` without `.` components, for prefix comparisons.
fn normalized(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}
