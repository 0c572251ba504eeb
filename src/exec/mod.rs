// src/exec/mod.rs

//! Execution layer.
//!
//! - [`node`] runs resolved [`ExecutableNode`](crate::graph::ExecutableNode)
//!   trees: sequences in order, parallel groups on a `JoinSet`, leaves under
//!   the worker semaphore.
//! - [`backend`] provides the `ExecutorBackend` trait the watch runtime talks
//!   to, and the `RealExecutorBackend` used in production. Tests swap in a
//!   fake.

pub mod backend;
pub mod node;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use node::{run_leaf, run_node, BuildContext, NodeOutcome};
