// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent, TaskOutcome};

/// Async shell around [`CoreRuntime`].
///
/// Reads events from the channel, feeds them to the core and hands the
/// resulting commands to an [`ExecutorBackend`].
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    dispatched: u64,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("dispatched", &self.dispatched)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            dispatched: 0,
        }
    }

    /// Process events until shutdown is requested or every sender is gone,
    /// then wait for runs that were already started.
    pub async fn run(mut self) -> Result<()> {
        info!("watch runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime event");
            if !self.apply(event).await {
                info!("shutdown requested");
                break;
            }
        }

        // Late completions fail fast instead of blocking on a full channel.
        self.event_rx.close();
        self.executor.drain().await;
        info!(runs = self.dispatched, "watch runtime stopped");
        Ok(())
    }

    /// Step the core with `event` and carry out its commands. Returns false
    /// once the runtime should stop.
    async fn apply(&mut self, event: RuntimeEvent) -> bool {
        let mut pending = vec![event];
        let mut keep_running = true;

        while let Some(event) = pending.pop() {
            let step = self.core.step(event);
            keep_running &= step.keep_running;

            for command in step.commands {
                let CoreCommand::RunTask(task) = command;
                self.dispatched += 1;
                if let Err(err) = self.executor.spawn_task(task.clone()).await {
                    // The run never started; release the task in the core.
                    warn!(task = %task, error = %err, "could not start task");
                    pending.push(RuntimeEvent::TaskCompleted {
                        task,
                        outcome: TaskOutcome::Failed,
                    });
                }
            }
        }

        keep_running
    }
}
