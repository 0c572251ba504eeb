// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::engine::queue::RerunQueue;
use crate::engine::{TaskOutcome, TriggerReason};
use crate::types::TaskName;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Run this task once, as a single leaf.
    RunTask(TaskName),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a task trigger.
///
/// - Idle task: start it now.
/// - Running task: remember one re-run for when it completes.
pub fn handle_task_trigger(
    known: &BTreeSet<TaskName>,
    running: &mut BTreeSet<TaskName>,
    queue: &mut RerunQueue,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    if !known.contains(&task) {
        warn!(task = %task, ?reason, "ignoring trigger for unknown task");
        return CoreStep::continue_with(Vec::new());
    }

    if running.contains(&task) {
        queue.record_trigger(&task);
        return CoreStep::continue_with(Vec::new());
    }

    debug!(task = %task, ?reason, "starting task");
    running.insert(task.clone());
    CoreStep::continue_with(vec![CoreCommand::RunTask(task)])
}

/// Handle a task completion.
///
/// If a re-run was queued while the task ran, it starts immediately.
pub fn handle_task_completion(
    running: &mut BTreeSet<TaskName>,
    queue: &mut RerunQueue,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    if !running.remove(&task) {
        debug!(task = %task, ?outcome, "completion for task that was not running");
    }

    if queue.take(&task) {
        debug!(task = %task, "starting queued re-run");
        running.insert(task.clone());
        return CoreStep::continue_with(vec![CoreCommand::RunTask(task)]);
    }

    CoreStep::continue_with(Vec::new())
}
