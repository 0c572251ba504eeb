// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    /// Every path passed to `write`, in call order.
    writes: Vec<PathBuf>,
    /// When set, every `rename` fails.
    fail_renames: bool,
}

/// In-memory filesystem for tests.
///
/// Directories are created implicitly for every ancestor of an added file.
/// Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.lock().dirs.insert(PathBuf::from("."));
        fs
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panic inside a test while holding the lock should not cascade.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        insert_ancestors(&mut state.dirs, &path);
        state.files.insert(path, content.into());
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        insert_ancestors(&mut state.dirs, &path);
        state.dirs.insert(path);
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.lock().files.remove(path.as_ref());
    }

    /// Contents of a file, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    /// All paths written through [`FileSystem::write`], in call order.
    pub fn written_paths(&self) -> Vec<PathBuf> {
        self.lock().writes.clone()
    }

    /// Make every later `rename` fail (or succeed again).
    pub fn fail_renames(&self, fail: bool) {
        self.lock().fail_renames = fail;
    }

    /// Number of regular files currently stored.
    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }
}

fn insert_ancestors(dirs: &mut BTreeSet<PathBuf>, path: &Path) {
    let mut current = path.parent();
    while let Some(parent) = current {
        if parent.as_os_str().is_empty() {
            dirs.insert(PathBuf::from("."));
            break;
        }
        if !dirs.insert(parent.to_path_buf()) {
            break;
        }
        current = parent.parent();
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let state = self.lock();
        match state.files.get(path) {
            Some(content) => Ok(content.clone()),
            None if state.dirs.contains(path) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let bytes = self.read(path)?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.dirs.contains(path) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        insert_ancestors(&mut state.dirs, path);
        state.files.insert(path.to_path_buf(), contents.to_vec());
        state.writes.push(path.to_path_buf());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.lock();
        if state.fail_renames {
            return Err(anyhow!("Rename refused: {:?} -> {:?}", from, to));
        }
        let content = state
            .files
            .remove(from)
            .ok_or_else(|| anyhow!("File not found: {:?}", from))?;
        insert_ancestors(&mut state.dirs, to);
        state.files.insert(to.to_path_buf(), content);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        if !state.dirs.contains(path) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        state.files.retain(|p, _| !p.starts_with(path));
        state.dirs.retain(|p| !p.starts_with(path));
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // Tests use absolute paths, so there is nothing to resolve.
        Ok(path.to_path_buf())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.lock();
        if !state.dirs.contains(path) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        let is_child = |p: &&PathBuf| p.parent() == Some(path);
        let mut children: Vec<PathBuf> = state
            .dirs
            .iter()
            .filter(is_child)
            .chain(state.files.keys().filter(is_child))
            .cloned()
            .collect();
        children.sort();
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_create_parent_dirs() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/src/a.txt", b"a".to_vec());

        assert!(fs.is_dir(Path::new("/proj")));
        assert!(fs.is_dir(Path::new("/proj/src")));
        assert_eq!(
            fs.read_dir(Path::new("/proj")).unwrap(),
            vec![PathBuf::from("/proj/src")]
        );
    }

    #[test]
    fn remove_dir_all_drops_descendants_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/out/a.css", b"a".to_vec());
        fs.add_file("/proj/out/nested/b.css", b"b".to_vec());
        fs.add_file("/proj/src/a.scss", b"a".to_vec());

        fs.remove_dir_all(Path::new("/proj/out")).unwrap();

        assert!(!fs.exists(Path::new("/proj/out")));
        assert!(!fs.exists(Path::new("/proj/out/nested/b.css")));
        assert!(fs.is_file(Path::new("/proj/src/a.scss")));
    }

    #[test]
    fn failing_renames_leave_the_target_untouched() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/index", b"old".to_vec());
        fs.add_file("/proj/index.tmp", b"new".to_vec());

        fs.fail_renames(true);
        assert!(fs.rename(Path::new("/proj/index.tmp"), Path::new("/proj/index")).is_err());
        assert_eq!(fs.contents("/proj/index").unwrap(), b"old");

        fs.fail_renames(false);
        fs.rename(Path::new("/proj/index.tmp"), Path::new("/proj/index")).unwrap();
        assert_eq!(fs.contents("/proj/index").unwrap(), b"new");
    }
}
