// src/runner/clean.rs

use std::path::{Component, Path};

use tracing::{debug, info};

use crate::errors::{AssetflowError, Result};
use crate::fs::FileSystem;
use crate::runner::report::CleanReport;

/// Reject paths that are absolute, climb with `..`, or name the root itself.
pub(crate) fn check_inside_root(dir: &Path) -> std::result::Result<(), String> {
    let mut depth = 0usize;
    for component in dir.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            _ => {
                return Err(format!(
                    "clean path {:?} must be relative and stay inside the project",
                    dir
                ));
            }
        }
    }
    if depth == 0 {
        return Err(format!("refusing to clean the project root ({:?})", dir));
    }
    Ok(())
}

/// Recursively remove `dir` (relative to `root`, or absolute under it).
///
/// A missing directory is a success with nothing removed, so cleaning twice
/// is harmless.
pub fn clean_dir(fs: &dyn FileSystem, root: &Path, dir: &Path) -> Result<CleanReport> {
    let rel = if dir.is_absolute() {
        dir.strip_prefix(root).map_err(|_| {
            AssetflowError::ConfigError(format!(
                "clean path {:?} is outside the project root {:?}",
                dir, root
            ))
        })?
    } else {
        dir
    };
    check_inside_root(rel).map_err(AssetflowError::ConfigError)?;

    let target = root.join(rel);
    let report = CleanReport {
        dir: rel.to_path_buf(),
        removed_files: 0,
    };

    if !fs.exists(&target) {
        debug!(dir = ?target, "nothing to clean");
        return Ok(report);
    }
    if !fs.is_dir(&target) {
        return Err(AssetflowError::ConfigError(format!(
            "clean path {:?} is not a directory",
            target
        )));
    }

    // Symlinks could still point the target at (or above) the root.
    let root_real = fs.canonicalize(root)?;
    let target_real = fs.canonicalize(&target)?;
    if target_real == root_real || !target_real.starts_with(&root_real) {
        return Err(AssetflowError::ConfigError(format!(
            "clean path {:?} resolves outside the project root",
            target
        )));
    }

    let removed_files = count_files(fs, &target)?;
    fs.remove_dir_all(&target)?;
    info!(dir = ?target, removed_files, "cleaned");

    Ok(CleanReport {
        removed_files,
        ..report
    })
}

fn count_files(fs: &dyn FileSystem, dir: &Path) -> Result<usize> {
    let mut count = 0;
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else {
                count += 1;
            }
        }
    }
    Ok(count)
}
