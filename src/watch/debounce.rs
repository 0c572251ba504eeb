// src/watch/debounce.rs

//! Per-task debouncing of filesystem events.
//!
//! Pure bookkeeping, no Tokio: the watcher loop feeds it events with their
//! arrival time and asks which tasks are due.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::types::TaskName;

/// Coalesces bursts of events per task.
///
/// The first event for a task opens a window of `window`; every event that
/// arrives before the window closes is folded into the same trigger.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadlines: BTreeMap<TaskName, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadlines: BTreeMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an event for `task` observed at `now`.
    ///
    /// Returns true if this event opened a new window.
    pub fn push(&mut self, task: &str, now: Instant) -> bool {
        if self.deadlines.contains_key(task) {
            return false;
        }
        self.deadlines.insert(task.to_string(), now + self.window);
        true
    }

    /// Remove and return every task whose window has closed at `now`.
    pub fn drain_due(&mut self, now: Instant) -> Vec<TaskName> {
        let due: Vec<TaskName> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(task, _)| task.clone())
            .collect();
        for task in &due {
            self.deadlines.remove(task);
        }
        due
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
