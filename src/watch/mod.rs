// src/watch/mod.rs

//! Glob matching and file watching.
//!
//! - [`patterns`] compiles `src` / `watch` / `exclude` globs and walks glob
//!   bases to select inputs.
//! - [`watcher`] runs `notify` watchers on the distinct glob bases and turns
//!   debounced events into task triggers.
//!
//! Nothing here knows about compositions; a watch event only ever names a
//! single task.

pub mod debounce;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use debounce::Debouncer;
pub use patterns::{collect_matching_files, glob_base, PatternSet, TaskWatchProfile};
pub use watcher::{spawn_watchers, watch_roots, WatcherHandle};
