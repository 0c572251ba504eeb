// src/graph/node.rs

use std::sync::Arc;

use crate::graph::task::Task;

/// A resolved, executable composition tree.
#[derive(Debug, Clone)]
pub enum ExecutableNode {
    Leaf(Arc<Task>),
    /// Run children in order; stop at the first failure.
    Sequence(Vec<ExecutableNode>),
    /// Run children concurrently; all of them run to completion.
    Parallel(Vec<ExecutableNode>),
}

impl ExecutableNode {
    /// Tasks in this tree, depth-first, in listed order. A task referenced
    /// twice appears twice.
    pub fn tasks(&self) -> Vec<&Arc<Task>> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Arc<Task>>) {
        match self {
            ExecutableNode::Leaf(task) => out.push(task),
            ExecutableNode::Sequence(nodes) | ExecutableNode::Parallel(nodes) => {
                for node in nodes {
                    node.collect(out);
                }
            }
        }
    }

    /// Compact one-line rendering, e.g. `seq(styles, par(images, fonts))`.
    pub fn describe(&self) -> String {
        match self {
            ExecutableNode::Leaf(task) => task.name().to_string(),
            ExecutableNode::Sequence(nodes) => format!("seq({})", describe_all(nodes)),
            ExecutableNode::Parallel(nodes) => format!("par({})", describe_all(nodes)),
        }
    }
}

fn describe_all(nodes: &[ExecutableNode]) -> String {
    nodes
        .iter()
        .map(ExecutableNode::describe)
        .collect::<Vec<_>>()
        .join(", ")
}
