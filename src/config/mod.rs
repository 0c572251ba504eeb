// src/config/mod.rs

//! `Assetflow.toml`: the raw serde model, loading, and the checks that turn
//! a [`RawConfigFile`] into a [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    load_and_validate, load_from_path, load_from_str, resolve_config_path, DEFAULT_CONFIG_FILE,
};
pub use model::{
    CompositionConfig, ConfigFile, ConfigSection, DefaultSection, NodeConfig, RawConfigFile,
    RenameConfig, TaskConfig, TransformConfig,
};
