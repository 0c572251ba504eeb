// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use crate::types::TaskName;

/// Re-runs requested while a task is already running.
///
/// At most one pending re-run is kept per task: any number of triggers that
/// arrive during a run collapse into a single follow-up run.
#[derive(Debug, Default)]
pub struct RerunQueue {
    pending: BTreeSet<TaskName>,
}

impl RerunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn contains(&self, task: &str) -> bool {
        self.pending.contains(task)
    }

    /// Record a trigger for a running task.
    ///
    /// Returns false if a re-run was already pending (the trigger coalesced).
    pub fn record_trigger(&mut self, task: &str) -> bool {
        let inserted = self.pending.insert(task.to_string());
        if inserted {
            debug!(task = %task, "queued re-run while task is running");
        } else {
            debug!(task = %task, "re-run already pending; coalescing trigger");
        }
        inserted
    }

    /// Take the pending re-run for `task`, if any.
    pub fn take(&mut self, task: &str) -> bool {
        self.pending.remove(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_triggers_collapse_into_one() {
        let mut q = RerunQueue::new();
        assert!(q.record_trigger("styles"));
        assert!(!q.record_trigger("styles"));
        assert!(!q.record_trigger("styles"));
        assert_eq!(q.len(), 1);

        assert!(q.take("styles"));
        assert!(!q.take("styles"));
        assert!(q.is_empty());
    }

    #[test]
    fn tasks_queue_independently() {
        let mut q = RerunQueue::new();
        q.record_trigger("styles");
        q.record_trigger("images");

        assert!(q.take("images"));
        assert!(q.contains("styles"));
    }
}
