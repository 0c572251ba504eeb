// src/graph/graph.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::model::{ConfigFile, NodeConfig};
use crate::errors::{AssetflowError, Result};
use crate::graph::node::ExecutableNode;
use crate::graph::task::{Task, TaskSpec};
use crate::graph::validate::check_compositions;
use crate::transform::TransformRegistry;
use crate::types::TaskName;
use crate::watch::patterns::TaskWatchProfile;

/// A named execution tree plus its run options.
#[derive(Debug, Clone)]
pub struct Composition {
    pub root: NodeConfig,
    /// Directories (relative to the project root) removed before running.
    pub clean: Vec<PathBuf>,
    /// Enter watch mode after the initial build.
    pub watch: bool,
}

impl Composition {
    pub fn sequence<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_root(NodeConfig::Sequence {
            sequence: names.into_iter().map(|n| NodeConfig::Name(n.into())).collect(),
        })
    }

    pub fn parallel<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_root(NodeConfig::Parallel {
            parallel: names.into_iter().map(|n| NodeConfig::Name(n.into())).collect(),
        })
    }

    pub fn from_root(root: NodeConfig) -> Self {
        Self {
            root,
            clean: Vec::new(),
            watch: false,
        }
    }

    pub fn with_clean(mut self, dir: impl Into<PathBuf>) -> Self {
        self.clean.push(dir.into());
        self
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }
}

/// Static composition of tasks plus watch bindings.
///
/// Built once, validated (unique names, known references, no cycles), and
/// immutable afterwards.
#[derive(Debug)]
pub struct TaskGraph {
    tasks: BTreeMap<TaskName, Arc<Task>>,
    compositions: BTreeMap<String, Composition>,
    watch_bindings: Vec<TaskWatchProfile>,
}

impl TaskGraph {
    pub fn builder() -> TaskGraphBuilder {
        TaskGraphBuilder::default()
    }

    /// Build the graph described by a validated config.
    pub fn from_config(cfg: &ConfigFile, registry: &TransformRegistry) -> Result<Self> {
        let default_skip = cfg.default_section().skip_unchanged.unwrap_or(false);
        let default_exclude = &cfg.default_section().exclude;

        let mut builder = TaskGraph::builder();

        for (name, task_cfg) in cfg.tasks() {
            let transform = registry.build(name, &task_cfg.transform)?;

            let mut spec = TaskSpec::new(name.clone(), task_cfg.src.clone(), &task_cfg.dest)
                .skip_unchanged(task_cfg.effective_skip_unchanged(default_skip))
                .watch(task_cfg.effective_watch())
                .exclude(task_cfg.effective_exclude(default_exclude));
            if let Some(rename) = &task_cfg.rename {
                spec = spec.rename(rename.clone());
            }

            let task = Task::new(spec, transform).map_err(|e| {
                AssetflowError::ConfigError(format!("task '{}': {:#}", name, e))
            })?;
            builder.add_task(task)?;
        }

        for (name, comp_cfg) in cfg.compositions() {
            let root = comp_cfg.root().ok_or_else(|| {
                AssetflowError::ConfigError(format!(
                    "composition '{}' must define exactly one of `sequence` or `parallel`",
                    name
                ))
            })?;
            let composition = Composition {
                root,
                clean: comp_cfg.clean.iter().map(PathBuf::from).collect(),
                watch: comp_cfg.watch,
            };
            builder.add_composition(name.clone(), composition)?;
        }

        builder.build()
    }

    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.tasks.get(name)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.tasks.values()
    }

    pub fn composition(&self, name: &str) -> Option<&Composition> {
        self.compositions.get(name)
    }

    pub fn compositions(&self) -> impl Iterator<Item = (&str, &Composition)> {
        self.compositions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Path pattern -> task bindings used in watch mode.
    pub fn watch_bindings(&self) -> &[TaskWatchProfile] {
        &self.watch_bindings
    }

    /// Watch bindings of the tasks reachable from `name` only; watching a
    /// composition never rebuilds tasks it does not contain.
    pub fn watch_bindings_for(&self, name: &str) -> Result<Vec<TaskWatchProfile>> {
        let node = self.resolve(name)?;
        let members: BTreeSet<&str> = node.tasks().into_iter().map(|t| t.name()).collect();
        Ok(self
            .watch_bindings
            .iter()
            .filter(|binding| members.contains(binding.name()))
            .cloned()
            .collect())
    }

    /// Resolve a composition or task name into an executable tree.
    ///
    /// A task name resolves to a single `Leaf`.
    pub fn resolve(&self, name: &str) -> Result<ExecutableNode> {
        if let Some(task) = self.tasks.get(name) {
            return Ok(ExecutableNode::Leaf(Arc::clone(task)));
        }
        match self.compositions.get(name) {
            Some(comp) => self.resolve_node(&comp.root),
            None => Err(AssetflowError::UnknownComposition(name.to_string())),
        }
    }

    fn resolve_node(&self, node: &NodeConfig) -> Result<ExecutableNode> {
        // References were checked to be acyclic when the graph was built.
        Ok(match node {
            NodeConfig::Name(name) => self.resolve(name)?,
            NodeConfig::Sequence { sequence } => ExecutableNode::Sequence(
                sequence
                    .iter()
                    .map(|n| self.resolve_node(n))
                    .collect::<Result<_>>()?,
            ),
            NodeConfig::Parallel { parallel } => ExecutableNode::Parallel(
                parallel
                    .iter()
                    .map(|n| self.resolve_node(n))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

/// Programmatic construction of a [`TaskGraph`].
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
    tasks: BTreeMap<TaskName, Arc<Task>>,
    compositions: BTreeMap<String, Composition>,
}

impl TaskGraphBuilder {
    /// Add a task. Names must be unique.
    pub fn add_task(&mut self, task: Task) -> Result<&mut Self> {
        let name = task.name().to_string();
        if self.tasks.contains_key(&name) {
            return Err(AssetflowError::ConfigError(format!(
                "duplicate task name '{}'",
                name
            )));
        }
        self.tasks.insert(name, Arc::new(task));
        Ok(self)
    }

    pub fn add_composition(
        &mut self,
        name: impl Into<String>,
        composition: Composition,
    ) -> Result<&mut Self> {
        let name = name.into();
        if self.compositions.contains_key(&name) {
            return Err(AssetflowError::ConfigError(format!(
                "duplicate composition name '{}'",
                name
            )));
        }
        self.compositions.insert(name, composition);
        Ok(self)
    }

    pub fn build(self) -> Result<TaskGraph> {
        let task_names: BTreeSet<&str> = self.tasks.keys().map(|k| k.as_str()).collect();
        let roots: BTreeMap<&str, &NodeConfig> = self
            .compositions
            .iter()
            .map(|(name, comp)| (name.as_str(), &comp.root))
            .collect();
        check_compositions(&task_names, &roots)?;

        let mut watch_bindings = Vec::with_capacity(self.tasks.len());
        for task in self.tasks.values() {
            let spec = task.spec();
            if spec.watch.is_empty() {
                continue;
            }
            let profile = TaskWatchProfile::new(task.name(), &spec.watch, &spec.exclude)
                .map_err(|e| AssetflowError::ConfigError(format!("{e:#}")))?;
            watch_bindings.push(profile);
        }

        debug!(
            tasks = self.tasks.len(),
            compositions = self.compositions.len(),
            watch_bindings = watch_bindings.len(),
            "task graph built"
        );

        Ok(TaskGraph {
            tasks: self.tasks,
            compositions: self.compositions,
            watch_bindings,
        })
    }
}
