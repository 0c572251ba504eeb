// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetflow",
    version,
    about = "Incremental build tasks for front-end assets.",
    long_about = None
)]
pub struct CliArgs {
    /// Composition (or single task) to run.
    #[arg(value_name = "COMPOSITION", default_value = "default")]
    pub composition: String,

    /// Path to the config file (TOML). Its directory is the project root. A
    /// bare file name is also searched for in parent directories.
    #[arg(long, value_name = "PATH", default_value = crate::config::DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Keep watching after the initial build and re-run tasks on change.
    #[arg(long)]
    pub watch: bool,

    /// Parse + validate, print tasks and compositions, run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
