#![allow(dead_code)]

pub use assetflow_test_utils::builders;
pub use assetflow_test_utils::fake_transform::FakeTransform;
pub use assetflow_test_utils::{init_tracing, with_timeout};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetflow::changes::ChangeSet;
use assetflow::fs::mock::MockFileSystem;
use assetflow::fs::FileSystem;
use assetflow::graph::{Composition, Task, TaskGraph, TaskSpec};
use assetflow::runner::{BuildOptions, BuildRunner};

pub const ROOT: &str = "/proj";

pub fn root() -> PathBuf {
    PathBuf::from(ROOT)
}

/// A task reading `src/<name>/*.txt` and writing into `out/<name>`, driven by
/// `transform`.
pub fn fake_task(name: &str, transform: &FakeTransform) -> Task {
    Task::new(
        TaskSpec::new(name, format!("src/{name}/*.txt"), format!("out/{name}")),
        Arc::new(transform.clone()),
    )
    .expect("valid task")
}

/// In-memory project with one input file per task.
pub fn mock_project(tasks: &[&str]) -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_dir(ROOT);
    for name in tasks {
        fs.add_file(
            format!("{ROOT}/src/{name}/{name}.txt"),
            format!("{name} input").into_bytes(),
        );
    }
    fs
}

/// Graph of `tasks` (each with its own fake transform) plus `compositions`.
pub fn graph_with(
    tasks: Vec<Task>,
    compositions: Vec<(&str, Composition)>,
) -> TaskGraph {
    let mut builder = TaskGraph::builder();
    for task in tasks {
        builder.add_task(task).expect("unique task");
    }
    for (name, comp) in compositions {
        builder.add_composition(name, comp).expect("unique composition");
    }
    builder.build().expect("valid graph")
}

pub fn runner_for(fs: &MockFileSystem, graph: TaskGraph) -> BuildRunner {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    let changes = Arc::new(ChangeSet::in_memory(Arc::clone(&fs)));
    BuildRunner::new(
        root(),
        fs,
        changes,
        Arc::new(graph),
        BuildOptions {
            workers: 4,
            ..BuildOptions::default()
        },
    )
}

pub fn out_path(task: &str, file: &str) -> PathBuf {
    Path::new(ROOT).join("out").join(task).join(file)
}
