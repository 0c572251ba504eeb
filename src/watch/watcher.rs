// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::watch::debounce::Debouncer;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::TaskWatchProfile;

/// Owns the live filesystem watchers and the debounce loop.
///
/// Dropping the handle stops watching.
pub struct WatcherHandle {
    watchers: Vec<RecommendedWatcher>,
    roots: Vec<PathBuf>,
    debounce_loop: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    /// Directories being watched recursively.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.watchers.clear();
        self.debounce_loop.abort();
    }
}

/// Directories to watch for `profiles`: the glob base of every distinct
/// pattern, resolved to the nearest existing directory, with directories
/// already covered by a watched ancestor dropped.
pub fn watch_roots(root: &Path, profiles: &[TaskWatchProfile]) -> Vec<PathBuf> {
    let mut candidates = BTreeSet::new();
    for profile in profiles {
        for base in profile.bases() {
            let mut dir = root.join(base);
            while !dir.is_dir() && dir != root {
                match dir.parent() {
                    Some(parent) => dir = parent.to_path_buf(),
                    None => break,
                }
            }
            candidates.insert(dir);
        }
    }

    let mut roots: Vec<PathBuf> = Vec::new();
    // BTreeSet order puts ancestors before their descendants.
    for dir in candidates {
        if !roots.iter().any(|kept| dir.starts_with(kept)) {
            roots.push(dir);
        }
    }
    roots
}

/// Start one recursive watcher per watch root and a debounce loop that turns
/// matching events into `RuntimeEvent::TaskTriggered`.
pub fn spawn_watchers(
    root: impl Into<PathBuf>,
    profiles: Vec<TaskWatchProfile>,
    debounce: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    let roots = watch_roots(&root, &profiles);
    let mut watchers = Vec::with_capacity(roots.len());
    for dir in &roots {
        let tx = event_tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    // The receiver is gone only while shutting down.
                    let _ = tx.send(event);
                }
                Err(err) => {
                    eprintln!("assetflow: file watch error: {err}");
                }
            },
            Config::default(),
        )
        .context("creating filesystem watcher")?;

        watcher
            .watch(dir, RecursiveMode::Recursive)
            .with_context(|| format!("watching {:?}", dir))?;
        info!(dir = ?dir, "watching");
        watchers.push(watcher);
    }
    drop(event_tx);

    let profiles = Arc::new(profiles);
    let debounce_loop = tokio::spawn(debounce_loop(
        root,
        profiles,
        Debouncer::new(debounce),
        event_rx,
        runtime_tx,
    ));

    Ok(WatcherHandle {
        watchers,
        roots,
        debounce_loop,
    })
}

async fn debounce_loop(
    root: PathBuf,
    profiles: Arc<Vec<TaskWatchProfile>>,
    mut debouncer: Debouncer,
    mut event_rx: mpsc::UnboundedReceiver<Event>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    loop {
        let next = debouncer.next_deadline();
        let sleep_until = tokio::time::Instant::from_std(
            next.unwrap_or_else(|| std::time::Instant::now() + debouncer.window()),
        );

        tokio::select! {
            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else {
                    debug!("watch event channel closed; debounce loop exiting");
                    return;
                };
                record_event(&root, &profiles, &mut debouncer, event);
            }
            _ = tokio::time::sleep_until(sleep_until), if next.is_some() => {
                for task in debouncer.drain_due(std::time::Instant::now()) {
                    debug!(task = %task, "debounce window closed -> triggering task");
                    let event = RuntimeEvent::TaskTriggered {
                        task,
                        reason: TriggerReason::FileWatch,
                    };
                    if let Err(err) = runtime_tx.send(event).await {
                        warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
                        return;
                    }
                }
            }
        }
    }
}

fn record_event(
    root: &Path,
    profiles: &[TaskWatchProfile],
    debouncer: &mut Debouncer,
    event: Event,
) {
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }

    let now = std::time::Instant::now();
    for path in &event.paths {
        let Some(rel) = relative_str(root, path) else {
            debug!(?path, "event outside project root; ignoring");
            continue;
        };

        for profile in profiles.iter().filter(|p| p.matches(&rel)) {
            if debouncer.push(profile.name(), now) {
                debug!(task = %profile.name(), path = %rel, "watch match; debouncing");
            }
        }
    }
}
