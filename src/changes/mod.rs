// src/changes/mod.rs

//! Change tracking for incremental builds.
//!
//! - [`hash`] computes content signatures (blake3).
//! - [`change_set`] holds the per-task `(path, signature)` records and
//!   answers "which of these inputs changed since the last success?".
//! - [`store`] persists those records to `.assetflow/changes` when
//!   `[config] change_store = "file"`.

pub mod change_set;
pub mod hash;
pub mod store;

pub use change_set::ChangeSet;
pub use hash::{compute_bytes_hash, compute_file_hash, Signature};
pub use store::{ChangeIndex, CHANGE_INDEX_PATH};
