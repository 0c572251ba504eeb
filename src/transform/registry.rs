// src/transform/registry.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::config::model::TransformConfig;
use crate::errors::AssetflowError;

use super::{CommandTransform, CopyTransform, Transform};

/// Builds a transform from its opaque options table.
pub type TransformFactory =
    Box<dyn Fn(&toml::Table) -> Result<Arc<dyn Transform>> + Send + Sync>;

/// Maps `transform.kind` to a factory.
///
/// [`TransformRegistry::with_builtins`] knows `copy` and `command`; library
/// users add their own kinds with [`TransformRegistry::register`].
#[derive(Default)]
pub struct TransformRegistry {
    factories: BTreeMap<String, TransformFactory>,
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("copy", |_options| Ok(Arc::new(CopyTransform)));
        registry.register("command", |options| {
            Ok(Arc::new(CommandTransform::from_options(options)?))
        });
        registry
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&toml::Table) -> Result<Arc<dyn Transform>> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|k| k.as_str())
    }

    /// Instantiate the transform declared by `cfg` for task `task`.
    pub fn build(
        &self,
        task: &str,
        cfg: &TransformConfig,
    ) -> std::result::Result<Arc<dyn Transform>, AssetflowError> {
        let factory = self.factories.get(&cfg.kind).ok_or_else(|| {
            AssetflowError::ConfigError(format!(
                "task '{}' uses unknown transform kind '{}' (known: {})",
                task,
                cfg.kind,
                self.kinds().collect::<Vec<_>>().join(", ")
            ))
        })?;

        factory(&cfg.options).map_err(|e| {
            AssetflowError::ConfigError(format!(
                "task '{}': invalid `{}` transform options: {:#}",
                task, cfg.kind, e
            ))
        })
    }
}
