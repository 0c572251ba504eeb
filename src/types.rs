use std::str::FromStr;
use std::time::Duration;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Where the change set keeps its `(path, signature)` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStoreMode {
    /// Persist entries in `.assetflow/changes` under the project root.
    File,
    /// Keep entries in memory only (lost on restart).
    Memory,
}

impl Default for ChangeStoreMode {
    fn default() -> Self {
        ChangeStoreMode::Memory
    }
}

impl FromStr for ChangeStoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(ChangeStoreMode::File),
            "memory" => Ok(ChangeStoreMode::Memory),
            other => Err(format!(
                "invalid change_store: {other} (expected \"file\" or \"memory\")"
            )),
        }
    }
}

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*(ms|s|m)?\s*$").expect("duration regex is valid")
});

/// Parse a short duration string such as `"100ms"`, `"2s"` or `"1m"`.
///
/// A bare number is read as milliseconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let caps = DURATION_RE
        .captures(s)
        .ok_or_else(|| format!("invalid duration: {s:?} (expected e.g. \"100ms\", \"2s\")"))?;

    let value: u64 = caps[1]
        .parse()
        .map_err(|e| format!("invalid duration value in {s:?}: {e}"))?;

    let duration = match caps.get(2).map(|m| m.as_str()) {
        None | Some("ms") => Duration::from_millis(value),
        Some("s") => Duration::from_secs(value),
        Some("m") => Duration::from_secs(value * 60),
        Some(other) => return Err(format!("unknown duration unit: {other}")),
    };

    Ok(duration)
}
