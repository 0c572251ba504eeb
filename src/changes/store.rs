// src/changes/store.rs

//! On-disk index for the change set.
//!
//! Format: one entry per `(task, input path)`, sorted, as
//!
//! ```text
//! <task>\t<path relative to root>\t<signature>
//! ```
//!
//! The file is rewritten as a whole into a temporary sibling and then renamed
//! over the old one, so readers never observe a half-written index.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::changes::hash::Signature;
use crate::fs::FileSystem;
use crate::types::TaskName;

/// Relative path (from the project root) to the persisted index.
pub const CHANGE_INDEX_PATH: &str = ".assetflow/changes";

pub type Entries = BTreeMap<TaskName, BTreeMap<PathBuf, Signature>>;

#[derive(Debug, Clone)]
pub struct ChangeIndex {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl ChangeIndex {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(CHANGE_INDEX_PATH)
    }

    fn temp_path(&self) -> PathBuf {
        self.root.join(format!("{CHANGE_INDEX_PATH}.tmp"))
    }

    /// Load all entries. A missing index is an empty one.
    pub fn load(&self) -> Result<Entries> {
        let path = self.path();
        if !self.fs.exists(&path) {
            return Ok(Entries::new());
        }

        let contents = self
            .fs
            .read_to_string(&path)
            .with_context(|| format!("reading change index at {:?}", path))?;

        let mut entries = Entries::new();
        for (lineno, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some((task, rel, sig)) => {
                    entries
                        .entry(task.to_string())
                        .or_default()
                        .insert(self.root.join(rel), sig.to_string());
                }
                None => warn!(line = lineno + 1, "skipping malformed change index entry"),
            }
        }

        debug!(tasks = entries.len(), "loaded change index");
        Ok(entries)
    }

    /// Atomically replace the index with `entries`.
    pub fn save(&self, entries: &Entries) -> Result<()> {
        let mut out = String::new();
        for (task, slice) in entries {
            for (path, sig) in slice {
                let rel = relative_to(&self.root, path);
                let _ = writeln!(out, "{}\t{}\t{}", task, rel, sig);
            }
        }

        let tmp = self.temp_path();
        self.fs
            .write(&tmp, out.as_bytes())
            .with_context(|| format!("writing change index to {:?}", tmp))?;
        self.fs.rename(&tmp, &self.path())?;
        Ok(())
    }
}

fn parse_line(line: &str) -> Option<(&str, &str, &str)> {
    let (task, rest) = line.split_once('\t')?;
    let (path, sig) = rest.rsplit_once('\t')?;
    if task.is_empty() || path.is_empty() || sig.is_empty() {
        return None;
    }
    Some((task, path, sig))
}

fn relative_to(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn save_then_load_keeps_entries_and_uses_relative_paths() {
        let fs = MockFileSystem::new();
        let index = ChangeIndex::new("/proj", Arc::new(fs.clone()));

        let mut entries = Entries::new();
        entries
            .entry("styles".to_string())
            .or_default()
            .insert(PathBuf::from("/proj/src/style.scss"), "abc".to_string());
        index.save(&entries).unwrap();

        let raw = fs.contents("/proj/.assetflow/changes").unwrap();
        assert_eq!(String::from_utf8(raw).unwrap(), "styles\tsrc/style.scss\tabc\n");
        assert!(!fs.exists(Path::new("/proj/.assetflow/changes.tmp")));

        assert_eq!(index.load().unwrap(), entries);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/proj/.assetflow/changes",
            "garbage\nfonts\ta.woff\tsig\n".as_bytes().to_vec(),
        );
        let index = ChangeIndex::new("/proj", Arc::new(fs));

        let entries = index.load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["fonts"][Path::new("/proj/a.woff")], "sig");
    }
}
