// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetflowError, Result};

/// File name looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "Assetflow.toml";

/// Read and deserialize `path` without semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        AssetflowError::ConfigError(format!("cannot read config {}: {e}", path.display()))
    })?;
    load_from_str(&contents)
}

/// Deserialize TOML text into the raw model.
pub fn load_from_str(contents: &str) -> Result<RawConfigFile> {
    Ok(toml::from_str(contents)?)
}

/// Load `path` and validate it into a [`ConfigFile`].
///
/// Rejected here: no tasks, bad globs, `workers = 0`, unparsable `debounce`,
/// malformed or empty groups, `clean` paths leaving the project, names used
/// for both a task and a composition, unknown references and composition
/// cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    ConfigFile::try_from(load_from_path(path)?)
}

/// Resolve the config file to use.
///
/// A path with a directory part is used as given. A bare file name is looked
/// up in `start` and then in each of its ancestors, so the tool can be run
/// from any subdirectory of a project.
pub fn resolve_config_path(requested: &Path, start: &Path) -> PathBuf {
    let bare = requested
        .parent()
        .is_none_or(|parent| parent.as_os_str().is_empty());
    if !bare || requested.is_absolute() {
        return requested.to_path_buf();
    }

    for dir in start.ancestors() {
        let candidate = dir.join(requested);
        if candidate.is_file() {
            debug!(config = ?candidate, "found config file");
            return candidate;
        }
    }
    start.join(requested)
}
