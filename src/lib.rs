// src/lib.rs

pub mod changes;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod graph;
pub mod logging;
pub mod runner;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::changes::ChangeSet;
use crate::cli::CliArgs;
use crate::config::loader::{load_and_validate, resolve_config_path};
use crate::config::model::ConfigFile;
use crate::fs::{FileSystem, RealFileSystem};
use crate::graph::TaskGraph;
use crate::runner::{BuildOptions, BuildRunner};
use crate::transform::TransformRegistry;
use crate::types::{ChangeStoreMode, TaskName};

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, builds the task graph, runs the requested
/// composition once and, if asked to, keeps watching until Ctrl-C.
pub async fn run(args: CliArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("resolving the current directory")?;
    let config_path = resolve_config_path(Path::new(&args.config), &cwd);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {:?}", config_path))?;
    let root = config_root_dir(&config_path);

    let registry = TransformRegistry::with_builtins();
    let graph = TaskGraph::from_config(&cfg, &registry)?;

    if args.dry_run {
        print_dry_run(&cfg, &graph);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let changes = open_change_set(&cfg, Arc::clone(&fs), &root, &graph)?;

    let options = BuildOptions::from_config(&cfg);
    let show_files = options.show_files;
    let watch = args.watch
        || graph
            .composition(&args.composition)
            .is_some_and(|c| c.watch);

    let mut runner = BuildRunner::new(root, fs, Arc::new(changes), Arc::new(graph), options);

    let report = runner.execute(&args.composition).await?;
    report.print_summary(show_files);

    if !watch {
        if let Some(err) = report.first_error() {
            anyhow::bail!(
                "'{}' failed: {} task(s) failed; first error: {}",
                args.composition,
                report.failed().count(),
                err
            );
        }
        return Ok(());
    }

    if !report.succeeded() {
        warn!("initial build failed; watching for changes anyway");
    }

    runner.start_watch(&args.composition)?;
    info!("watching for changes (Ctrl-C to stop)");

    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl-C")?;
    info!("Ctrl-C received; shutting down");
    runner.shutdown().await;

    Ok(())
}

fn open_change_set(
    cfg: &ConfigFile,
    fs: Arc<dyn FileSystem>,
    root: &Path,
    graph: &TaskGraph,
) -> Result<ChangeSet> {
    let changes = match cfg.config.change_store {
        ChangeStoreMode::Memory => ChangeSet::in_memory(fs),
        ChangeStoreMode::File => ChangeSet::persistent(fs, root)?,
    };

    // Drop entries of tasks that were renamed or removed.
    let active: Vec<TaskName> = graph.task_names().map(str::to_string).collect();
    if let Err(err) = changes.prune(&active) {
        warn!(error = %err, "failed to prune stale change entries");
    }
    Ok(changes)
}

/// Project root: the directory holding the config file, or the current
/// directory for a bare file name.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_dry_run(cfg: &ConfigFile, graph: &TaskGraph) {
    println!("assetflow dry-run");
    println!("  config.change_store = {:?}", cfg.config.change_store);
    println!("  config.debounce = {:?}", cfg.debounce());
    if let Some(workers) = cfg.config.workers {
        println!("  config.workers = {workers}");
    }
    println!();

    println!("tasks ({}):", cfg.tasks().len());
    for task in graph.tasks() {
        let spec = task.spec();
        println!("  - {}", spec.name);
        println!("      src: {}", spec.src);
        println!("      dest: {}", spec.dest.display());
        println!("      transform: {}", task.transform_kind());
        if spec.skip_unchanged {
            println!("      skip_unchanged: true");
        }
        if !spec.exclude.is_empty() {
            println!("      exclude: {:?}", spec.exclude);
        }
        if let Some(rename) = &spec.rename {
            println!("      rename: {:?}", rename);
        }
    }
    println!();

    println!("compositions ({}):", cfg.compositions().len());
    for (name, comp) in graph.compositions() {
        match graph.resolve(name) {
            Ok(node) => println!("  - {name}: {}", node.describe()),
            Err(err) => println!("  - {name}: <{err}>"),
        }
        if !comp.clean.is_empty() {
            println!("      clean: {:?}", comp.clean);
        }
        if comp.watch {
            println!("      watch: true");
        }
    }
    println!();

    println!("watch bindings ({}):", graph.watch_bindings().len());
    for binding in graph.watch_bindings() {
        println!("  - {:?}", binding);
    }

    debug!("dry-run complete (no execution)");
}
