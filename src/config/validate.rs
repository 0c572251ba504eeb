// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use globset::Glob;

use crate::config::model::{ConfigFile, NodeConfig, RawConfigFile};
use crate::errors::{AssetflowError, Result};
use crate::graph::validate::check_compositions;
use crate::runner::clean::check_inside_root;
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AssetflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.config,
            raw.default,
            raw.task,
            raw.composition,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_tasks(cfg)?;
    validate_compositions(cfg)?;
    validate_composition_graph(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(AssetflowError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.workers == Some(0) {
        return Err(AssetflowError::ConfigError(
            "[config].workers must be >= 1 (got 0)".to_string(),
        ));
    }

    parse_duration(&cfg.config.debounce)
        .map_err(|e| AssetflowError::ConfigError(format!("[config].debounce: {e}")))?;

    for pattern in &cfg.default.exclude {
        check_glob("[default].exclude", pattern)?;
    }

    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.src.trim().is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "task '{}' has an empty `src` pattern",
                name
            )));
        }
        if task.dest.trim().is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "task '{}' has an empty `dest` directory",
                name
            )));
        }
        if task.transform.kind.trim().is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "task '{}' has an empty `transform.kind`",
                name
            )));
        }

        let context = format!("task '{name}'");
        check_glob(&context, &task.src)?;
        for pattern in task.watch.iter().flatten() {
            check_glob(&context, pattern)?;
        }
        for pattern in task.exclude.iter().flatten() {
            check_glob(&context, pattern)?;
        }
    }
    Ok(())
}

fn validate_compositions(cfg: &RawConfigFile) -> Result<()> {
    for (name, comp) in cfg.composition.iter() {
        let root = comp.root().ok_or_else(|| {
            AssetflowError::ConfigError(format!(
                "composition '{}' must define exactly one of `sequence` or `parallel`",
                name
            ))
        })?;

        ensure_non_empty_groups(name, &root)?;

        for dir in &comp.clean {
            check_clean_dir(name, dir)?;
        }
    }
    Ok(())
}

fn ensure_non_empty_groups(composition: &str, node: &NodeConfig) -> Result<()> {
    match node {
        NodeConfig::Name(_) => Ok(()),
        NodeConfig::Sequence { sequence: nodes } | NodeConfig::Parallel { parallel: nodes } => {
            if nodes.is_empty() {
                return Err(AssetflowError::ConfigError(format!(
                    "composition '{}' contains an empty group",
                    composition
                )));
            }
            nodes
                .iter()
                .try_for_each(|n| ensure_non_empty_groups(composition, n))
        }
    }
}

fn check_clean_dir(composition: &str, dir: &str) -> Result<()> {
    check_inside_root(Path::new(dir))
        .map_err(|e| AssetflowError::ConfigError(format!("composition '{}': {}", composition, e)))
}

fn check_glob(context: &str, pattern: &str) -> Result<()> {
    Glob::new(pattern).map_err(|e| {
        AssetflowError::ConfigError(format!("{context}: invalid glob pattern '{pattern}': {e}"))
    })?;
    Ok(())
}

fn validate_composition_graph(cfg: &RawConfigFile) -> Result<()> {
    let tasks: BTreeSet<&str> = cfg.task.keys().map(|k| k.as_str()).collect();
    let roots: Vec<(&str, NodeConfig)> = cfg
        .composition
        .iter()
        .filter_map(|(name, comp)| comp.root().map(|root| (name.as_str(), root)))
        .collect();
    let compositions: BTreeMap<&str, &NodeConfig> =
        roots.iter().map(|(name, root)| (*name, root)).collect();

    check_compositions(&tasks, &compositions)
}
