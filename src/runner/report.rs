// src/runner/report.rs

//! Per-task and per-build results, plus the human-readable summary.

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::TransformError;
use crate::graph::WrittenFile;
use crate::types::TaskName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    /// Nothing changed since the last successful run; transform not invoked.
    Skipped,
    Failed(TransformError),
}

impl TaskStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed(_))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Succeeded => f.write_str("ok"),
            TaskStatus::Skipped => f.write_str("unchanged"),
            TaskStatus::Failed(_) => f.write_str("FAILED"),
        }
    }
}

/// Outcome of running one task once.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: TaskName,
    pub status: TaskStatus,
    pub duration: Duration,
    pub bytes: u64,
    pub files: Vec<WrittenFile>,
}

impl TaskReport {
    pub fn succeeded(&self) -> bool {
        !self.status.is_failure()
    }

    pub fn error(&self) -> Option<&TransformError> {
        match &self.status {
            TaskStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Result of a `clean` step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub dir: PathBuf,
    pub removed_files: usize,
}

/// Outcome of executing one composition (or single task).
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub composition: String,
    pub cleaned: Vec<CleanReport>,
    /// Tasks in completion order. Tasks never reached (after a sequence
    /// failure) are absent.
    pub tasks: Vec<TaskReport>,
    pub duration: Duration,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        self.tasks.iter().all(TaskReport::succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskReport> {
        self.tasks.iter().filter(|r| !r.succeeded())
    }

    pub fn first_error(&self) -> Option<&TransformError> {
        self.tasks.iter().find_map(TaskReport::error)
    }

    pub fn task(&self, name: &str) -> Option<&TaskReport> {
        self.tasks.iter().find(|r| r.task == name)
    }

    pub fn total_bytes(&self) -> u64 {
        self.tasks.iter().map(|r| r.bytes).sum()
    }

    /// Print a summary: one line per task with status, duration and size,
    /// optionally followed by every written file.
    pub fn write_summary(&self, out: &mut impl Write, show_files: bool) -> io::Result<()> {
        for clean in &self.cleaned {
            writeln!(
                out,
                "[assetflow] cleaned {} ({} files)",
                clean.dir.display(),
                clean.removed_files
            )?;
        }

        for report in &self.tasks {
            writeln!(
                out,
                "[assetflow] {:<16} {:<9} {:>8}  {}",
                report.task,
                report.status,
                format_duration(report.duration),
                format_size(report.bytes),
            )?;
            if let Some(err) = report.error() {
                writeln!(out, "             {}: {}", err.path.display(), err.message)?;
            }
            if show_files {
                for file in &report.files {
                    writeln!(
                        out,
                        "             {} {}",
                        file.path.display(),
                        format_size(file.bytes)
                    )?;
                }
            }
        }

        let failed = self.failed().count();
        writeln!(
            out,
            "[assetflow] '{}' {} in {} ({} tasks, {} failed, {})",
            self.composition,
            if failed == 0 { "finished" } else { "failed" },
            format_duration(self.duration),
            self.tasks.len(),
            failed,
            format_size(self.total_bytes()),
        )
    }

    pub fn print_summary(&self, show_files: bool) {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        // Summary output is best effort.
        let _ = self.write_summary(&mut lock, show_files);
    }
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "kB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

pub fn format_duration(d: Duration) -> String {
    if d.as_secs() >= 1 {
        format!("{:.2} s", d.as_secs_f64())
    } else {
        format!("{} ms", d.as_millis())
    }
}
