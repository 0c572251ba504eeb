// src/transform/mod.rs

//! Opaque transformation steps.
//!
//! A [`Transform`] turns one input file into zero or more output artifacts.
//! The orchestrator never looks inside: it reads the input, hands it over,
//! and writes whatever comes back. Concrete format work (style compilers,
//! bundlers, image optimisers) is reached through the `command` transform or
//! through custom implementations registered in a [`TransformRegistry`].
//!
//! - [`copy`] passes bytes through unchanged.
//! - [`command`] pipes the input through an external program.
//! - [`registry`] maps `transform.kind` to a factory.
//! - [`rename`] applies `rename = { .. }` to output file names.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

pub mod command;
pub mod copy;
pub mod registry;
pub mod rename;

pub use command::CommandTransform;
pub use copy::CopyTransform;
pub use registry::{TransformFactory, TransformRegistry};
pub use rename::apply_rename;

/// One input handed to a transform.
#[derive(Debug, Clone)]
pub struct TransformInput {
    /// Absolute (or root-joined) path of the source file.
    pub path: PathBuf,
    /// Path relative to the glob base of the task's `src` pattern.
    pub rel_path: PathBuf,
    pub contents: Vec<u8>,
}

/// One output produced by a transform, relative to the task's `dest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub rel_path: PathBuf,
    pub contents: Vec<u8>,
}

impl Artifact {
    pub fn new(rel_path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            rel_path: rel_path.into(),
            contents: contents.into(),
        }
    }
}

pub type TransformFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Vec<Artifact>>> + Send + 'a>>;

/// Trait abstracting a single transformation step.
///
/// Implementations must be safe to call concurrently for different inputs;
/// tasks in a `parallel` group may share one transform instance.
pub trait Transform: Send + Sync + fmt::Debug {
    /// Short identifier used in logs and as the failing stage in errors.
    fn kind(&self) -> &str;

    fn apply<'a>(&'a self, input: &'a TransformInput) -> TransformFuture<'a>;
}
