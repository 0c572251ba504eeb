// src/changes/change_set.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::changes::hash::{compute_file_hash, Signature};
use crate::changes::store::{ChangeIndex, Entries};
use crate::fs::FileSystem;
use crate::types::TaskName;

#[derive(Debug, Default)]
struct ChangeState {
    /// Signatures recorded by the last successful processing of each input.
    committed: Entries,
    /// Signatures observed by the most recent `delta`, not yet committed.
    pending: Entries,
}

/// Per-task record of previously processed inputs.
///
/// Each task owns its own slice, keyed by task name, so tasks running in
/// parallel never touch the same entries. The set is shared (behind an `Arc`)
/// between the initial build and every watch-triggered re-run.
#[derive(Debug)]
pub struct ChangeSet {
    fs: Arc<dyn FileSystem>,
    state: Mutex<ChangeState>,
    index: Option<ChangeIndex>,
}

impl ChangeSet {
    /// A change set that lives for the process only.
    pub fn in_memory(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            state: Mutex::new(ChangeState::default()),
            index: None,
        }
    }

    /// A change set backed by `<root>/.assetflow/changes`.
    pub fn persistent(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Result<Self> {
        let index = ChangeIndex::new(root, Arc::clone(&fs));
        let committed = index.load()?;
        info!(path = ?index.path(), tasks = committed.len(), "using persisted change index");
        Ok(Self {
            fs,
            state: Mutex::new(ChangeState {
                committed,
                pending: Entries::new(),
            }),
            index: Some(index),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ChangeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the candidates that are new or whose content differs from the
    /// last committed signature for `task`.
    ///
    /// The signatures observed here are remembered, so a later [`commit`]
    /// records the version that was actually processed even if the file is
    /// edited again while the transform runs.
    ///
    /// [`commit`]: ChangeSet::commit
    pub fn delta(&self, task: &str, candidates: &[PathBuf]) -> BTreeSet<PathBuf> {
        // Hash outside the lock.
        let observed: Vec<(PathBuf, Option<Signature>)> = candidates
            .iter()
            .map(|path| {
                let sig = match compute_file_hash(self.fs.as_ref(), path) {
                    Ok(sig) => Some(sig),
                    Err(err) => {
                        warn!(task, ?path, error = %err, "failed to hash input; treating as changed");
                        None
                    }
                };
                (path.clone(), sig)
            })
            .collect();

        let mut state = self.lock();
        let committed = state.committed.get(task);

        let mut changed = BTreeSet::new();
        let mut pending = BTreeMap::new();
        for (path, sig) in observed {
            let previous = committed.and_then(|slice| slice.get(&path));
            let unchanged = matches!((previous, &sig), (Some(old), Some(new)) if old == new);
            if unchanged {
                continue;
            }
            if let Some(sig) = sig {
                pending.insert(path.clone(), sig);
            }
            changed.insert(path);
        }

        debug!(
            task,
            candidates = candidates.len(),
            changed = changed.len(),
            "computed change delta"
        );

        state.pending.insert(task.to_string(), pending);
        changed
    }

    /// Record `paths` as successfully processed for `task`.
    ///
    /// Only the given paths are recorded; callers pass exactly the inputs
    /// whose outputs were written.
    pub fn commit(&self, task: &str, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let mut state = self.lock();
        let mut pending = state.pending.remove(task).unwrap_or_default();

        let mut recorded = Vec::with_capacity(paths.len());
        for path in paths {
            let sig = match pending.remove(path) {
                Some(sig) => sig,
                None => compute_file_hash(self.fs.as_ref(), path)?,
            };
            recorded.push((path.clone(), sig));
        }

        if !pending.is_empty() {
            state.pending.insert(task.to_string(), pending);
        }

        let previous = state.committed.get(task).cloned();
        let slice = state.committed.entry(task.to_string()).or_default();
        for (path, sig) in recorded {
            slice.insert(path, sig);
        }

        if let Some(index) = &self.index {
            if let Err(err) = index.save(&state.committed) {
                // Memory must not claim inputs the index never recorded.
                match previous {
                    Some(slice) => state.committed.insert(task.to_string(), slice),
                    None => state.committed.remove(task),
                };
                return Err(err);
            }
        }

        debug!(task, committed = paths.len(), "committed input signatures");
        Ok(())
    }

    /// Location of the persisted index, if this set has one.
    pub fn index_path(&self) -> Option<PathBuf> {
        self.index.as_ref().map(ChangeIndex::path)
    }

    /// Signature last committed for `path` under `task`.
    pub fn signature(&self, task: &str, path: &Path) -> Option<Signature> {
        self.lock()
            .committed
            .get(task)
            .and_then(|slice| slice.get(path))
            .cloned()
    }

    /// Number of committed entries for `task`.
    pub fn len(&self, task: &str) -> usize {
        self.lock().committed.get(task).map_or(0, |slice| slice.len())
    }

    /// Drop everything recorded for `task`, forcing a full rebuild next time.
    pub fn forget(&self, task: &str) -> Result<()> {
        let mut state = self.lock();
        state.pending.remove(task);
        if state.committed.remove(task).is_some() {
            if let Some(index) = &self.index {
                index.save(&state.committed)?;
            }
        }
        Ok(())
    }

    /// Remove slices of tasks that are not in `active_tasks` (e.g. renamed or
    /// removed from the config since the index was written).
    pub fn prune(&self, active_tasks: &[TaskName]) -> Result<()> {
        let mut state = self.lock();
        let initial = state.committed.len();
        state.committed.retain(|task, _| active_tasks.contains(task));
        state.pending.retain(|task, _| active_tasks.contains(task));

        if state.committed.len() < initial {
            info!(removed = initial - state.committed.len(), "pruned stale change set entries");
            if let Some(index) = &self.index {
                index.save(&state.committed)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn setup() -> (MockFileSystem, ChangeSet, Vec<PathBuf>) {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/a.txt", b"a".to_vec());
        fs.add_file("/proj/b.txt", b"b".to_vec());
        let changes = ChangeSet::in_memory(Arc::new(fs.clone()));
        let paths = vec![PathBuf::from("/proj/a.txt"), PathBuf::from("/proj/b.txt")];
        (fs, changes, paths)
    }

    #[test]
    fn everything_is_changed_at_first() {
        let (_fs, changes, paths) = setup();
        let delta = changes.delta("t", &paths);
        assert_eq!(delta.len(), 2);
    }

    #[test]
    fn committed_inputs_drop_out_of_the_delta() {
        let (fs, changes, paths) = setup();
        changes.delta("t", &paths);
        changes.commit("t", &paths).unwrap();

        assert!(changes.delta("t", &paths).is_empty());

        fs.add_file("/proj/a.txt", b"A".to_vec());
        let delta = changes.delta("t", &paths);
        assert_eq!(delta.into_iter().collect::<Vec<_>>(), vec![PathBuf::from("/proj/a.txt")]);
    }

    #[test]
    fn partial_commit_keeps_failed_inputs_changed() {
        let (_fs, changes, paths) = setup();
        changes.delta("t", &paths);
        changes.commit("t", &paths[..1]).unwrap();

        let delta = changes.delta("t", &paths);
        assert_eq!(delta.into_iter().collect::<Vec<_>>(), vec![PathBuf::from("/proj/b.txt")]);
    }

    #[test]
    fn commit_records_the_version_seen_by_delta() {
        let (fs, changes, paths) = setup();
        changes.delta("t", &paths);
        // Edited while the transform was running.
        fs.add_file("/proj/a.txt", b"edited".to_vec());
        changes.commit("t", &paths).unwrap();

        let delta = changes.delta("t", &paths);
        assert!(delta.contains(Path::new("/proj/a.txt")));
        assert!(!delta.contains(Path::new("/proj/b.txt")));
    }

    #[test]
    fn slices_are_partitioned_by_task() {
        let (_fs, changes, paths) = setup();
        changes.delta("styles", &paths);
        changes.commit("styles", &paths).unwrap();

        assert_eq!(changes.delta("scripts", &paths).len(), 2);
        assert!(changes.delta("styles", &paths).is_empty());
    }

    #[test]
    fn forget_and_prune_clear_slices() {
        let (_fs, changes, paths) = setup();
        for task in ["a", "b"] {
            changes.delta(task, &paths);
            changes.commit(task, &paths).unwrap();
        }

        changes.forget("a").unwrap();
        assert_eq!(changes.len("a"), 0);

        changes.prune(&["a".to_string()]).unwrap();
        assert_eq!(changes.len("b"), 0);
    }

    #[test]
    fn persistent_set_survives_reload() {
        let (fs, _changes, paths) = setup();
        let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());

        let first = ChangeSet::persistent(Arc::clone(&shared), "/proj").unwrap();
        first.delta("t", &paths);
        first.commit("t", &paths).unwrap();

        let second = ChangeSet::persistent(shared, "/proj").unwrap();
        assert!(second.delta("t", &paths).is_empty());
    }
}
