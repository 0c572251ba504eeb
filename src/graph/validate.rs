// src/graph/validate.rs

//! Static checks over composition references, shared by config validation
//! and [`TaskGraphBuilder`](crate::graph::TaskGraphBuilder).

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::NodeConfig;
use crate::errors::{AssetflowError, Result};

/// Check that:
/// - no name is both a task and a composition,
/// - every referenced name exists,
/// - composition references are acyclic.
pub fn check_compositions(
    tasks: &BTreeSet<&str>,
    compositions: &BTreeMap<&str, &NodeConfig>,
) -> Result<()> {
    for name in compositions.keys() {
        if tasks.contains(name) {
            return Err(AssetflowError::ConfigError(format!(
                "name '{}' is used by both a task and a composition",
                name
            )));
        }
    }

    // Edge direction: composition -> composition it references.
    // Tasks are leaves and cannot close a cycle.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in compositions.keys() {
        graph.add_node(*name);
    }

    for (name, root) in compositions.iter() {
        for referenced in root.referenced_names() {
            if tasks.contains(referenced) {
                continue;
            }
            let Some((target, _)) = compositions.get_key_value(referenced) else {
                return Err(AssetflowError::ConfigError(format!(
                    "composition '{}' references unknown task or composition '{}'",
                    name, referenced
                )));
            };
            if target == name {
                return Err(AssetflowError::GraphCycle(format!(
                    "composition '{}' references itself",
                    name
                )));
            }
            graph.add_edge(*name, *target, ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(AssetflowError::GraphCycle(format!(
            "cycle detected in compositions involving '{}'",
            cycle.node_id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> NodeConfig {
        NodeConfig::Name(s.to_string())
    }

    #[test]
    fn nested_references_are_fine() {
        let tasks: BTreeSet<&str> = ["styles", "images"].into_iter().collect();
        let assets = NodeConfig::Parallel { parallel: vec![name("images")] };
        let build = NodeConfig::Sequence { sequence: vec![name("styles"), name("assets")] };
        let comps: BTreeMap<&str, &NodeConfig> =
            [("assets", &assets), ("build", &build)].into_iter().collect();

        check_compositions(&tasks, &comps).unwrap();
    }

    #[test]
    fn cycles_are_rejected() {
        let tasks: BTreeSet<&str> = ["t"].into_iter().collect();
        let a = NodeConfig::Sequence { sequence: vec![name("t"), name("b")] };
        let b = NodeConfig::Parallel { parallel: vec![name("a")] };
        let comps: BTreeMap<&str, &NodeConfig> = [("a", &a), ("b", &b)].into_iter().collect();

        match check_compositions(&tasks, &comps) {
            Err(AssetflowError::GraphCycle(msg)) => assert!(msg.contains("cycle detected")),
            other => panic!("expected GraphCycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_reference_is_a_config_error() {
        let tasks: BTreeSet<&str> = ["t"].into_iter().collect();
        let a = NodeConfig::Sequence { sequence: vec![name("missing")] };
        let comps: BTreeMap<&str, &NodeConfig> = [("a", &a)].into_iter().collect();

        match check_compositions(&tasks, &comps) {
            Err(AssetflowError::ConfigError(msg)) => assert!(msg.contains("'missing'")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn task_and_composition_names_must_differ() {
        let tasks: BTreeSet<&str> = ["styles"].into_iter().collect();
        let styles = NodeConfig::Parallel { parallel: vec![name("styles")] };
        let comps: BTreeMap<&str, &NodeConfig> = [("styles", &styles)].into_iter().collect();

        assert!(matches!(
            check_compositions(&tasks, &comps),
            Err(AssetflowError::ConfigError(_))
        ));
    }
}
