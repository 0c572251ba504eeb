// src/graph/mod.rs

//! Tasks and their composition into executable trees.
//!
//! - [`task`] defines a single [`Task`]: input selection, transform, output.
//! - [`node`] defines the resolved [`ExecutableNode`] tree.
//! - [`graph`] holds the validated [`TaskGraph`] and its builder.
//! - [`validate`] contains the reference / cycle checks shared with config
//!   validation.

pub mod graph;
pub mod node;
pub mod task;
pub mod validate;

pub use graph::{Composition, TaskGraph, TaskGraphBuilder};
pub use node::ExecutableNode;
pub use task::{Task, TaskOutput, TaskSpec, WrittenFile};
