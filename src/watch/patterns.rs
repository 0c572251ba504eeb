// src/watch/patterns.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::types::TaskName;
use crate::watch::path_utils::to_slash;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Compiled include/exclude globs, evaluated against paths relative to the
/// project root (forward slashes, e.g. `"src/assets/js/main.js"`).
#[derive(Clone)]
pub struct PatternSet {
    include: GlobSet,
    exclude: Option<GlobSet>,
    /// Glob bases of the include patterns: the directories worth walking or
    /// watching.
    bases: Vec<PathBuf>,
    source: Vec<String>,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("patterns", &self.source)
            .field("bases", &self.bases)
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set = build_globset(include).context("building include globset")?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };

        let bases: BTreeSet<PathBuf> = include.iter().map(|p| glob_base(p)).collect();

        Ok(Self {
            include: include_set,
            exclude: exclude_set,
            bases: bases.into_iter().collect(),
            source: include.to_vec(),
        })
    }

    /// Returns true if `rel_path` matches an include pattern and no exclude
    /// pattern.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }

    pub fn bases(&self) -> &[PathBuf] {
        &self.bases
    }

    pub fn patterns(&self) -> &[String] {
        &self.source
    }
}

/// Build a GlobSet where `*` does not cross `/`, as in shell globs.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Leading directory of `pattern` that contains no glob metacharacters.
///
/// Outputs mirror inputs relative to this directory:
/// - `"src/assets/images/*.png"` -> `"src/assets/images"`
/// - `"src/assets/fonts/**/*"` -> `"src/assets/fonts"`
/// - `"src/assets/scss/style.scss"` -> `"src/assets/scss"` (a literal file)
pub fn glob_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern
        .split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .collect();

    let literal = parts
        .iter()
        .take_while(|p| !p.contains(GLOB_META))
        .count();

    // A fully literal pattern names a file; its base is the parent dir.
    let take = if literal == parts.len() {
        literal.saturating_sub(1)
    } else {
        literal
    };

    parts[..take].iter().collect()
}

/// Collect all files under `root` that match `patterns`, sorted.
///
/// Only the glob bases are walked, so a pattern like `src/js/**/*.js` never
/// descends into output or dependency directories elsewhere in the project.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &PatternSet,
) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();

    for base in patterns.bases() {
        let start = root.join(base);
        if !fs.is_dir(&start) {
            continue;
        }

        let mut stack = vec![start];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                } else if fs.is_file(&path) {
                    if let Ok(rel) = path.strip_prefix(root) {
                        if patterns.matches(&to_slash(rel)) {
                            files.insert(path);
                        }
                    }
                }
            }
        }
    }

    Ok(files.into_iter().collect())
}

/// Compiled watch patterns for a single task.
#[derive(Clone)]
pub struct TaskWatchProfile {
    name: TaskName,
    patterns: PatternSet,
}

impl fmt::Debug for TaskWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWatchProfile")
            .field("name", &self.name)
            .field("patterns", &self.patterns.patterns())
            .finish()
    }
}

impl TaskWatchProfile {
    pub fn new(name: impl Into<TaskName>, watch: &[String], exclude: &[String]) -> Result<Self> {
        let name = name.into();
        let patterns = PatternSet::new(watch, exclude)
            .with_context(|| format!("building watch patterns for task {name}"))?;
        Ok(Self { name, patterns })
    }

    /// Name of the task this profile belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directories (relative to the project root) this profile needs watched.
    pub fn bases(&self) -> &[PathBuf] {
        self.patterns.bases()
    }

    /// Returns true if this task should be re-run for the given path
    /// (relative to project root), e.g. `"src/assets/scss/_vars.scss"`.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.patterns.matches(rel_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn glob_base_stops_at_first_meta_component() {
        assert_eq!(glob_base("src/assets/images/*.{jpg,png}"), PathBuf::from("src/assets/images"));
        assert_eq!(glob_base("src/assets/fonts/**/*"), PathBuf::from("src/assets/fonts"));
        assert_eq!(glob_base("./src/assets/scss/style.scss"), PathBuf::from("src/assets/scss"));
        assert_eq!(glob_base("*.txt"), PathBuf::new());
    }

    #[test]
    fn star_does_not_cross_directories() {
        let set = PatternSet::new(&s(&["src/*.txt"]), &[]).unwrap();
        assert!(set.matches("src/a.txt"));
        assert!(!set.matches("src/nested/a.txt"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let set = PatternSet::new(
            &s(&["src/images/**/*.{png,jpg}"]),
            &s(&["**/favicon.*"]),
        )
        .unwrap();
        assert!(set.matches("src/images/logo.png"));
        assert!(set.matches("src/images/icons/a.jpg"));
        assert!(!set.matches("src/images/favicon.png"));
    }

    #[test]
    fn collect_walks_only_glob_bases() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/src/js/main.js", b"".to_vec());
        fs.add_file("/proj/src/js/lib/util.js", b"".to_vec());
        fs.add_file("/proj/src/js/readme.md", b"".to_vec());
        fs.add_file("/proj/assets/js/main.min.js", b"".to_vec());

        let set = PatternSet::new(&s(&["src/js/**/*.js"]), &[]).unwrap();
        let files = collect_matching_files(&fs, Path::new("/proj"), &set).unwrap();

        assert_eq!(
            files,
            vec![
                PathBuf::from("/proj/src/js/lib/util.js"),
                PathBuf::from("/proj/src/js/main.js"),
            ]
        );
    }

    #[test]
    fn missing_base_yields_no_files() {
        let fs = MockFileSystem::new();
        fs.add_dir("/proj");
        let set = PatternSet::new(&s(&["src/fonts/**/*"]), &[]).unwrap();
        assert!(collect_matching_files(&fs, Path::new("/proj"), &set).unwrap().is_empty());
    }
}
