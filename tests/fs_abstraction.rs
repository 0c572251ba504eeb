// tests/fs_abstraction.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetflow::changes::{compute_file_hash, ChangeSet};
use assetflow::fs::mock::MockFileSystem;
use assetflow::fs::FileSystem;
use assetflow::watch::patterns::{collect_matching_files, PatternSet};

#[test]
fn test_mock_fs_hashing() {
    let fs = MockFileSystem::new();
    fs.add_file("test.txt", b"hello world".to_vec());

    let hash = compute_file_hash(&fs, &PathBuf::from("test.txt")).unwrap();
    // blake3 hash of "hello world"
    assert_eq!(hash, "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24");
}

#[test]
fn test_mock_fs_patterns() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/js/main.js", b"main()".to_vec());
    fs.add_file("/proj/src/js/vendor/lib.js", b"lib()".to_vec());
    fs.add_file("/proj/src/js/vendor/lib.min.js", b"lib()".to_vec());
    fs.add_file("/proj/README.md", b"# Readme".to_vec());

    let set = PatternSet::new(
        &["src/js/**/*.js".to_string()],
        &["**/*.min.js".to_string()],
    )
    .unwrap();
    let files = collect_matching_files(&fs, Path::new("/proj"), &set).unwrap();

    assert_eq!(
        files,
        vec![
            PathBuf::from("/proj/src/js/main.js"),
            PathBuf::from("/proj/src/js/vendor/lib.js"),
        ]
    );
}

#[test]
fn test_mock_fs_change_set_delta() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/a.txt", b"a".to_vec());
    fs.add_file("/proj/b.txt", b"b".to_vec());
    let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
    let changes = ChangeSet::in_memory(shared);

    let all = vec![PathBuf::from("/proj/a.txt"), PathBuf::from("/proj/b.txt")];
    assert_eq!(changes.delta("t", &all).len(), 2);
    changes.commit("t", &all).unwrap();
    assert!(changes.delta("t", &all).is_empty());

    fs.add_file("/proj/b.txt", b"b2".to_vec());
    let delta: Vec<PathBuf> = changes.delta("t", &all).into_iter().collect();
    assert_eq!(delta, vec![PathBuf::from("/proj/b.txt")]);

    // Other tasks have their own slice.
    assert_eq!(changes.delta("other", &all).len(), 2);
}
