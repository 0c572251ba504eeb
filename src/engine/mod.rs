// src/engine/mod.rs

//! Watch-mode orchestration.
//!
//! The pure state machine lives in [`core`]; [`runtime`] is the async shell
//! that feeds it events from the watcher and executor and carries out the
//! commands it returns.

use crate::types::TaskName;

/// Coarse outcome of one task run, as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Skipped,
    Failed,
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Requested directly (library callers, tests).
    Manual,
    /// A debounced filesystem event matched the task's watch patterns.
    FileWatch,
}

/// Events flowing into the runtime from the watcher and the executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (Ctrl-C or `BuildRunner::shutdown`).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::RerunQueue;
pub use runtime::Runtime;
