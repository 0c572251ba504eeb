// src/errors.rs

//! Crate-wide error types and aliases.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::TaskName;

#[derive(Error, Debug)]
pub enum AssetflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown task or composition: {0}")]
    UnknownComposition(String),

    #[error("Cycle detected in task graph: {0}")]
    GraphCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Pipeline stage at which a single input failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Reading the input file.
    Read,
    /// Inside the transform itself; carries the transform kind.
    Transform(String),
    /// Writing an output artifact.
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Read => f.write_str("read"),
            Stage::Transform(kind) => f.write_str(kind),
            Stage::Write => f.write_str("write"),
        }
    }
}

/// A single input failed its transform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("task '{task}' failed on {path:?} during {stage}: {message}")]
pub struct TransformError {
    pub task: TaskName,
    pub path: PathBuf,
    pub stage: Stage,
    pub message: String,
}

impl TransformError {
    pub fn new(
        task: impl Into<TaskName>,
        path: impl Into<PathBuf>,
        stage: Stage,
        message: impl Into<String>,
    ) -> Self {
        Self {
            task: task.into(),
            path: path.into(),
            stage,
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetflowError>;
