// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{parse_duration, ChangeStoreMode};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// change_store = "memory"
/// debounce = "100ms"
///
/// [default]
/// skip_unchanged = true
/// exclude = ["**/.DS_Store"]
///
/// [task.styles]
/// src = "src/assets/scss/style.scss"
/// dest = "assets/css"
/// watch = ["src/assets/scss/**/*.scss"]
/// transform = { kind = "command", cmd = "sass --stdin" }
/// rename = { suffix = ".min", extension = "css" }
///
/// [composition.default]
/// parallel = ["styles"]
/// watch = true
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub default: DefaultSection,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Named execution trees from `[composition.<name>]`.
    #[serde(default)]
    pub composition: BTreeMap<String, CompositionConfig>,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub default: DefaultSection,
    pub task: BTreeMap<String, TaskConfig>,
    pub composition: BTreeMap<String, CompositionConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        default: DefaultSection,
        task: BTreeMap<String, TaskConfig>,
        composition: BTreeMap<String, CompositionConfig>,
    ) -> Self {
        Self {
            config,
            default,
            task,
            composition,
        }
    }

    pub fn default_section(&self) -> &DefaultSection {
        &self.default
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn compositions(&self) -> &BTreeMap<String, CompositionConfig> {
        &self.composition
    }

    /// Debounce window for watch mode. Validated at load time.
    pub fn debounce(&self) -> Duration {
        parse_duration(&self.config.debounce).unwrap_or(DEFAULT_DEBOUNCE)
    }
}

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"memory"` (default) or `"file"`.
    #[serde(default)]
    pub change_store: ChangeStoreMode,

    /// Window within which watch events for one task coalesce, e.g. `"100ms"`.
    #[serde(default = "default_debounce")]
    pub debounce: String,

    /// Maximum number of tasks running at once. Defaults to the available
    /// parallelism of the machine.
    #[serde(default)]
    pub workers: Option<usize>,

    /// Print every written file in the build summary, not just totals.
    #[serde(default)]
    pub show_files: bool,
}

fn default_debounce() -> String {
    "100ms".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            change_store: ChangeStoreMode::default(),
            debounce: default_debounce(),
            workers: None,
            show_files: false,
        }
    }
}

/// `[default]` section: values inherited by tasks that do not set them.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    #[serde(default)]
    pub skip_unchanged: Option<bool>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Input glob, relative to the project root.
    pub src: String,

    /// Output directory, relative to the project root.
    pub dest: String,

    /// Patterns that re-trigger this task in watch mode. Defaults to `[src]`.
    #[serde(default)]
    pub watch: Option<Vec<String>>,

    /// Patterns removed from both input selection and watching.
    ///
    /// If `None`, the task uses `default.exclude`.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,

    /// If true, `default.exclude` is appended to `task.exclude`.
    #[serde(default)]
    pub append_default_exclude: bool,

    /// Skip the transform entirely when no input changed since the last
    /// successful run. Falls back to `default.skip_unchanged`, then `false`.
    #[serde(default)]
    pub skip_unchanged: Option<bool>,

    pub transform: TransformConfig,

    #[serde(default)]
    pub rename: Option<RenameConfig>,
}

impl TaskConfig {
    pub fn effective_skip_unchanged(&self, default_skip: bool) -> bool {
        self.skip_unchanged.unwrap_or(default_skip)
    }

    /// Effective watch list: the task's own list, or just its `src`.
    pub fn effective_watch(&self) -> Vec<String> {
        match &self.watch {
            Some(list) => list.clone(),
            None => vec![self.src.clone()],
        }
    }

    /// Effective exclude list given `default.exclude`.
    pub fn effective_exclude(&self, default_exclude: &[String]) -> Vec<String> {
        match (&self.exclude, self.append_default_exclude) {
            (Some(list), true) => {
                let mut combined = list.clone();
                combined.extend(default_exclude.iter().cloned());
                combined
            }
            (Some(list), false) => list.clone(),
            (None, _) => default_exclude.to_vec(),
        }
    }
}

/// Transform declaration. `kind` selects a factory from the transform
/// registry; every other key is handed to that factory untouched.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TransformConfig {
    pub kind: String,

    #[serde(flatten)]
    pub options: toml::Table,
}

impl TransformConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: toml::Table::new(),
        }
    }
}

/// Output file renaming, applied to the file name of every artifact.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RenameConfig {
    #[serde(default)]
    pub prefix: Option<String>,

    /// Appended to the file stem, e.g. `".min"`.
    #[serde(default)]
    pub suffix: Option<String>,

    /// Replacement extension without the leading dot, e.g. `"css"`.
    #[serde(default)]
    pub extension: Option<String>,
}

/// `[composition.<name>]` section.
///
/// Exactly one of `sequence` / `parallel` must be present.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CompositionConfig {
    #[serde(default)]
    pub sequence: Option<Vec<NodeConfig>>,

    #[serde(default)]
    pub parallel: Option<Vec<NodeConfig>>,

    /// Output directories removed before the composition runs.
    #[serde(default)]
    pub clean: Vec<String>,

    /// Enter watch mode after the initial build.
    #[serde(default)]
    pub watch: bool,
}

impl CompositionConfig {
    /// The root node of this composition, if well formed.
    pub fn root(&self) -> Option<NodeConfig> {
        match (&self.sequence, &self.parallel) {
            (Some(seq), None) => Some(NodeConfig::Sequence {
                sequence: seq.clone(),
            }),
            (None, Some(par)) => Some(NodeConfig::Parallel {
                parallel: par.clone(),
            }),
            _ => None,
        }
    }
}

/// One entry of a composition: a task/composition name or a nested group.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum NodeConfig {
    Name(String),
    Sequence { sequence: Vec<NodeConfig> },
    Parallel { parallel: Vec<NodeConfig> },
}

impl NodeConfig {
    /// All names referenced by this node, depth-first.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            NodeConfig::Name(name) => out.push(name.as_str()),
            NodeConfig::Sequence { sequence: nodes } | NodeConfig::Parallel { parallel: nodes } => {
                for node in nodes {
                    node.collect_names(out);
                }
            }
        }
    }
}
