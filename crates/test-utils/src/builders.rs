#![allow(dead_code)]

use std::collections::BTreeMap;

use assetflow::config::model::{
    CompositionConfig, ConfigFile, ConfigSection, DefaultSection, NodeConfig, RawConfigFile,
    RenameConfig, TaskConfig, TransformConfig,
};
use assetflow::errors::Result;
use assetflow::types::ChangeStoreMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                default: DefaultSection::default(),
                task: BTreeMap::new(),
                composition: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_composition(mut self, name: &str, composition: CompositionConfig) -> Self {
        self.config.composition.insert(name.to_string(), composition);
        self
    }

    pub fn with_default_exclude(mut self, pattern: &str) -> Self {
        self.config.default.exclude.push(pattern.to_string());
        self
    }

    pub fn with_default_skip_unchanged(mut self, val: bool) -> Self {
        self.config.default.skip_unchanged = Some(val);
        self
    }

    pub fn with_change_store(mut self, mode: ChangeStoreMode) -> Self {
        self.config.config.change_store = mode;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.config.workers = Some(workers);
        self
    }

    pub fn with_debounce(mut self, debounce: &str) -> Self {
        self.config.config.debounce = debounce.to_string();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`. Defaults to the `copy` transform.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(src: &str, dest: &str) -> Self {
        Self {
            task: TaskConfig {
                src: src.to_string(),
                dest: dest.to_string(),
                watch: None,
                exclude: None,
                append_default_exclude: false,
                skip_unchanged: None,
                transform: TransformConfig::new("copy"),
                rename: None,
            },
        }
    }

    pub fn kind(mut self, kind: &str) -> Self {
        self.task.transform.kind = kind.to_string();
        self
    }

    pub fn option(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.task
            .transform
            .options
            .insert(key.to_string(), value.into());
        self
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        let watches = self.task.watch.get_or_insert(vec![]);
        watches.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        let excludes = self.task.exclude.get_or_insert(vec![]);
        excludes.push(pattern.to_string());
        self
    }

    pub fn append_default_exclude(mut self, val: bool) -> Self {
        self.task.append_default_exclude = val;
        self
    }

    pub fn skip_unchanged(mut self, val: bool) -> Self {
        self.task.skip_unchanged = Some(val);
        self
    }

    pub fn rename(mut self, suffix: Option<&str>, extension: Option<&str>) -> Self {
        self.task.rename = Some(RenameConfig {
            prefix: None,
            suffix: suffix.map(str::to_string),
            extension: extension.map(str::to_string),
        });
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Builder for `CompositionConfig`.
pub struct CompositionBuilder {
    composition: CompositionConfig,
}

impl CompositionBuilder {
    pub fn sequence(nodes: Vec<NodeConfig>) -> Self {
        Self {
            composition: CompositionConfig {
                sequence: Some(nodes),
                ..CompositionConfig::default()
            },
        }
    }

    pub fn parallel(nodes: Vec<NodeConfig>) -> Self {
        Self {
            composition: CompositionConfig {
                parallel: Some(nodes),
                ..CompositionConfig::default()
            },
        }
    }

    pub fn clean(mut self, dir: &str) -> Self {
        self.composition.clean.push(dir.to_string());
        self
    }

    pub fn watch(mut self, val: bool) -> Self {
        self.composition.watch = val;
        self
    }

    pub fn build(self) -> CompositionConfig {
        self.composition
    }
}

/// `NodeConfig::Name` shorthand.
pub fn name(s: &str) -> NodeConfig {
    NodeConfig::Name(s.to_string())
}

/// Names as a list of `NodeConfig::Name`.
pub fn names(list: &[&str]) -> Vec<NodeConfig> {
    list.iter().map(|s| name(s)).collect()
}
