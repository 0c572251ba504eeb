// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! Consumes [`RuntimeEvent`]s and returns the commands the IO shell should
//! carry out. No channels, no Tokio, no filesystem; every watch-mode rule
//! (one run per task at a time, at most one pending re-run) is decided here.

use std::collections::BTreeSet;

use crate::engine::event_handlers::{handle_task_completion, handle_task_trigger, CoreStep};
use crate::engine::queue::RerunQueue;
use crate::engine::RuntimeEvent;
use crate::types::TaskName;

#[derive(Debug)]
pub struct CoreRuntime {
    known: BTreeSet<TaskName>,
    running: BTreeSet<TaskName>,
    queue: RerunQueue,
}

impl CoreRuntime {
    pub fn new<I, S>(tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Self {
            known: tasks.into_iter().map(Into::into).collect(),
            running: BTreeSet::new(),
            queue: RerunQueue::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_empty()
    }

    pub fn is_running(&self, task: &str) -> bool {
        self.running.contains(task)
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => handle_task_trigger(
                &self.known,
                &mut self.running,
                &mut self.queue,
                task,
                reason,
            ),
            RuntimeEvent::TaskCompleted { task, outcome } => {
                handle_task_completion(&mut self.running, &mut self.queue, task, outcome)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
