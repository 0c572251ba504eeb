// tests/incremental.rs

mod common;
use crate::common::{init_tracing, mock_project, root, FakeTransform, ROOT};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetflow::changes::ChangeSet;
use assetflow::errors::Stage;
use assetflow::fs::mock::MockFileSystem;
use assetflow::fs::{FileSystem, RealFileSystem};
use assetflow::graph::{Task, TaskSpec};
use assetflow::transform::{Artifact, Transform, TransformFuture, TransformInput};

fn txt_task(transform: &FakeTransform, skip_unchanged: bool) -> Task {
    Task::new(
        TaskSpec::new("text", "src/*.txt", "out").skip_unchanged(skip_unchanged),
        Arc::new(transform.clone()),
    )
    .unwrap()
}

fn project_with_ab() -> MockFileSystem {
    let fs = mock_project(&[]);
    fs.add_file(format!("{ROOT}/src/a.txt"), b"alpha".to_vec());
    fs.add_file(format!("{ROOT}/src/b.txt"), b"beta".to_vec());
    fs
}

#[tokio::test]
async fn unchanged_inputs_invoke_the_transform_once() {
    init_tracing();
    let fs = project_with_ab();
    let changes = ChangeSet::in_memory(Arc::new(fs.clone()));
    let transform = FakeTransform::new();
    let task = txt_task(&transform, true);

    let first = task.run(&fs, &root(), &changes).await.unwrap();
    assert!(!first.skipped);
    assert_eq!(first.processed, 2);

    let second = task.run(&fs, &root(), &changes).await.unwrap();
    assert!(second.skipped);
    assert_eq!(second.matched, 2);
    assert!(second.files.is_empty());

    assert_eq!(transform.call_count(), 2, "one call per input, first run only");
}

#[tokio::test]
async fn without_skip_unchanged_every_run_transforms_everything() {
    let fs = project_with_ab();
    let changes = ChangeSet::in_memory(Arc::new(fs.clone()));
    let transform = FakeTransform::new();
    let task = txt_task(&transform, false);

    task.run(&fs, &root(), &changes).await.unwrap();
    task.run(&fs, &root(), &changes).await.unwrap();

    assert_eq!(transform.call_count(), 4);
    assert_eq!(changes.len("text"), 0, "nothing recorded without skip_unchanged");
}

#[tokio::test]
async fn only_succeeded_inputs_are_committed() {
    init_tracing();
    let fs = project_with_ab();
    let changes = ChangeSet::in_memory(Arc::new(fs.clone()));
    let transform = FakeTransform::new();
    transform.fail_on("b.txt");
    let task = txt_task(&transform, true);

    let err = task.run(&fs, &root(), &changes).await.unwrap_err();
    assert_eq!(err.task, "text");
    assert_eq!(err.path, PathBuf::from(format!("{ROOT}/src/b.txt")));
    assert_eq!(err.stage, Stage::Transform("fake".to_string()));

    // a.txt was still processed and written.
    assert_eq!(fs.contents(format!("{ROOT}/out/a.txt")), Some(b"ALPHA".to_vec()));
    assert!(changes.signature("text", Path::new(&format!("{ROOT}/src/a.txt"))).is_some());
    assert!(changes.signature("text", Path::new(&format!("{ROOT}/src/b.txt"))).is_none());

    // The failed input stays in the delta and is retried next run.
    transform.stop_failing("b.txt");
    transform.reset_calls();
    let output = task.run(&fs, &root(), &changes).await.unwrap();
    assert_eq!(output.processed, 1);
    assert_eq!(transform.calls(), vec![PathBuf::from("b.txt")]);
}

#[tokio::test]
async fn directories_matching_the_pattern_are_not_inputs() {
    let fs = project_with_ab();
    let changes = ChangeSet::in_memory(Arc::new(fs.clone()));
    let task = txt_task(&FakeTransform::new(), false);

    fs.remove_file(format!("{ROOT}/src/a.txt"));
    fs.add_dir(format!("{ROOT}/src/ghost.txt"));

    let output = task.run(&fs, &root(), &changes).await.unwrap();
    assert_eq!(output.matched, 1);
    assert_eq!(output.processed, 1);
}

/// Inputs `{a.txt, b.txt}`, `*.txt`, skip-unchanged: modifying only `a.txt`
/// re-processes only `a.txt` and leaves `b.txt`'s output untouched.
#[tokio::test]
async fn end_to_end_incremental_rebuild_on_disk() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("src/a.txt"), "alpha").unwrap();
    std::fs::write(root.join("src/b.txt"), "beta").unwrap();

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let changes = ChangeSet::in_memory(Arc::clone(&fs));
    let transform = FakeTransform::new();
    let task = txt_task(&transform, true);

    let first = task.run(fs.as_ref(), &root, &changes).await.unwrap();
    assert_eq!(first.processed, 2);
    let mut calls = transform.calls();
    calls.sort();
    assert_eq!(calls, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);

    let b_out = root.join("out/b.txt");
    let b_modified = std::fs::metadata(&b_out).unwrap().modified().unwrap();

    std::fs::write(root.join("src/a.txt"), "alpha v2").unwrap();
    transform.reset_calls();

    let second = task.run(fs.as_ref(), &root, &changes).await.unwrap();
    assert_eq!(second.processed, 1);
    assert_eq!(transform.calls(), vec![PathBuf::from("a.txt")]);
    assert_eq!(std::fs::read_to_string(root.join("out/a.txt")).unwrap(), "ALPHA V2");
    assert_eq!(std::fs::read_to_string(&b_out).unwrap(), "BETA");
    assert_eq!(
        std::fs::metadata(&b_out).unwrap().modified().unwrap(),
        b_modified,
        "b.txt output must not be rewritten"
    );
}

#[tokio::test]
async fn persisted_change_index_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("src/a.txt"), "alpha").unwrap();

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let transform = FakeTransform::new();
    let task = txt_task(&transform, true);

    {
        let changes = ChangeSet::persistent(Arc::clone(&fs), &root).unwrap();
        task.run(fs.as_ref(), &root, &changes).await.unwrap();
    }
    assert!(root.join(".assetflow/changes").is_file());

    let changes = ChangeSet::persistent(Arc::clone(&fs), &root).unwrap();
    let output = task.run(fs.as_ref(), &root, &changes).await.unwrap();
    assert!(output.skipped);
    assert_eq!(transform.call_count(), 1);
}

#[tokio::test]
async fn outputs_mirror_paths_below_the_glob_base() {
    let fs = mock_project(&[]);
    fs.add_file(format!("{ROOT}/src/fonts/a.woff"), b"a".to_vec());
    fs.add_file(format!("{ROOT}/src/fonts/icons/b.woff"), b"b".to_vec());
    let changes = ChangeSet::in_memory(Arc::new(fs.clone()));

    let task = Task::new(
        TaskSpec::new("fonts", "src/fonts/**/*", "assets/fonts"),
        Arc::new(FakeTransform::new()),
    )
    .unwrap();

    task.run(&fs, &root(), &changes).await.unwrap();

    assert!(fs.contents(format!("{ROOT}/assets/fonts/a.woff")).is_some());
    assert!(fs.contents(format!("{ROOT}/assets/fonts/icons/b.woff")).is_some());
}

#[tokio::test]
async fn failing_to_persist_signatures_fails_the_task() {
    init_tracing();
    let fs = project_with_ab();
    let changes = ChangeSet::persistent(Arc::new(fs.clone()), root()).unwrap();
    let transform = FakeTransform::new();
    let task = txt_task(&transform, true);

    fs.fail_renames(true);
    let err = task.run(&fs, &root(), &changes).await.unwrap_err();
    assert_eq!(err.task, "text");
    assert_eq!(err.stage, Stage::Write);
    assert_eq!(err.path, root().join(".assetflow/changes"));
    assert_eq!(changes.len("text"), 0, "nothing is recorded that the index lacks");

    fs.fail_renames(false);
    let output = task.run(&fs, &root(), &changes).await.unwrap();
    assert!(!output.skipped);
    assert_eq!(output.processed, 2);
    assert_eq!(changes.len("text"), 2);
}

/// Emits a single artifact at a fixed relative path.
#[derive(Debug)]
struct FixedArtifact(&'static str);

impl Transform for FixedArtifact {
    fn kind(&self) -> &str {
        "fixed"
    }

    fn apply<'a>(&'a self, input: &'a TransformInput) -> TransformFuture<'a> {
        Box::pin(async move { Ok(vec![Artifact::new(self.0, input.contents.clone())]) })
    }
}

#[tokio::test]
async fn artifacts_cannot_escape_the_destination() {
    for rel in ["../escape.txt", "/tmp/escape.txt", "nested/../../escape.txt"] {
        let fs = project_with_ab();
        let changes = ChangeSet::in_memory(Arc::new(fs.clone()));
        let task = Task::new(
            TaskSpec::new("text", "src/*.txt", "out"),
            Arc::new(FixedArtifact(rel)),
        )
        .unwrap();

        let err = task.run(&fs, &root(), &changes).await.unwrap_err();
        assert_eq!(err.stage, Stage::Write, "{rel}");
        assert!(fs.written_paths().is_empty(), "{rel} was written");
    }
}
