// src/graph/task.rs

//! A single build task: transform + input selection + destination.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::changes::{ChangeSet, CHANGE_INDEX_PATH};
use crate::config::model::RenameConfig;
use crate::errors::{Stage, TransformError};
use crate::fs::FileSystem;
use crate::transform::{apply_rename, Transform, TransformInput};
use crate::types::TaskName;
use crate::watch::patterns::{collect_matching_files, glob_base, PatternSet};

/// Static description of a task, as read from `[task.<name>]`.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: TaskName,
    pub src: String,
    pub dest: PathBuf,
    pub watch: Vec<String>,
    pub exclude: Vec<String>,
    pub skip_unchanged: bool,
    pub rename: Option<RenameConfig>,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>, src: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        let src = src.into();
        Self {
            name: name.into(),
            watch: vec![src.clone()],
            src,
            dest: dest.into(),
            exclude: Vec::new(),
            skip_unchanged: false,
            rename: None,
        }
    }

    pub fn skip_unchanged(mut self, val: bool) -> Self {
        self.skip_unchanged = val;
        self
    }

    pub fn watch(mut self, patterns: Vec<String>) -> Self {
        self.watch = patterns;
        self
    }

    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn rename(mut self, rename: RenameConfig) -> Self {
        self.rename = Some(rename);
        self
    }
}

/// One output file written by a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Result of a successful [`Task::run`].
#[derive(Debug, Clone, Default)]
pub struct TaskOutput {
    /// Number of inputs matched by `src`.
    pub matched: usize,
    /// Number of inputs handed to the transform.
    pub processed: usize,
    pub files: Vec<WrittenFile>,
    /// True when nothing changed and the transform was not invoked.
    pub skipped: bool,
}

impl TaskOutput {
    pub fn bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes).sum()
    }
}

/// A named binding of a transform to an input selection and output location.
///
/// Immutable once built; shared between runs via `Arc`.
pub struct Task {
    spec: TaskSpec,
    inputs: PatternSet,
    input_base: PathBuf,
    transform: Arc<dyn Transform>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.spec.name)
            .field("src", &self.spec.src)
            .field("dest", &self.spec.dest)
            .field("transform", &self.transform.kind())
            .field("skip_unchanged", &self.spec.skip_unchanged)
            .finish()
    }
}

impl Task {
    pub fn new(spec: TaskSpec, transform: Arc<dyn Transform>) -> anyhow::Result<Self> {
        if spec.src.trim().is_empty() {
            anyhow::bail!("task '{}' has an empty input pattern", spec.name);
        }
        let inputs = PatternSet::new(std::slice::from_ref(&spec.src), &spec.exclude)?;
        let input_base = glob_base(&spec.src);
        Ok(Self {
            spec,
            inputs,
            input_base,
            transform,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn transform_kind(&self) -> &str {
        self.transform.kind()
    }

    /// Inputs currently matching `src` (minus `exclude`) under `root`.
    pub fn select_inputs(
        &self,
        fs: &dyn FileSystem,
        root: &Path,
    ) -> Result<Vec<PathBuf>, TransformError> {
        collect_matching_files(fs, root, &self.inputs).map_err(|e| {
            TransformError::new(
                self.name(),
                root.join(&self.input_base),
                Stage::Read,
                format!("{e:#}"),
            )
        })
    }

    /// Run the task once.
    ///
    /// - With `skip_unchanged`, only inputs reported by the change set are
    ///   processed, and an empty delta is a successful no-op.
    /// - Every selected input is attempted; inputs whose outputs were all
    ///   written are committed, and the first failure is returned.
    pub async fn run(
        &self,
        fs: &dyn FileSystem,
        root: &Path,
        changes: &ChangeSet,
    ) -> Result<TaskOutput, TransformError> {
        let candidates = self.select_inputs(fs, root)?;
        let matched = candidates.len();

        let targets: Vec<PathBuf> = if self.spec.skip_unchanged {
            changes.delta(self.name(), &candidates).into_iter().collect()
        } else {
            candidates
        };

        if self.spec.skip_unchanged && targets.is_empty() {
            debug!(task = %self.name(), matched, "no inputs changed; skipping transform");
            return Ok(TaskOutput {
                matched,
                skipped: true,
                ..TaskOutput::default()
            });
        }

        let mut files = Vec::new();
        let mut succeeded = Vec::with_capacity(targets.len());
        let mut first_error: Option<TransformError> = None;

        for path in &targets {
            match self.process_input(fs, root, path).await {
                Ok(mut written) => {
                    files.append(&mut written);
                    succeeded.push(path.clone());
                }
                Err(err) => {
                    warn!(task = %self.name(), path = ?path, stage = %err.stage, "{}", err.message);
                    first_error.get_or_insert(err);
                }
            }
        }

        if self.spec.skip_unchanged {
            if let Err(err) = changes.commit(self.name(), &succeeded) {
                warn!(task = %self.name(), error = %err, "failed to record input signatures");
                let index = changes
                    .index_path()
                    .unwrap_or_else(|| root.join(CHANGE_INDEX_PATH));
                first_error.get_or_insert(TransformError::new(
                    self.name(),
                    index,
                    Stage::Write,
                    format!("recording input signatures: {err:#}"),
                ));
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(TaskOutput {
                matched,
                processed: targets.len(),
                files,
                skipped: false,
            }),
        }
    }

    async fn process_input(
        &self,
        fs: &dyn FileSystem,
        root: &Path,
        path: &Path,
    ) -> Result<Vec<WrittenFile>, TransformError> {
        let fail = |stage: Stage, message: String| TransformError::new(self.name(), path, stage, message);

        let contents = fs.read(path).map_err(|e| fail(Stage::Read, format!("{e:#}")))?;

        let base = root.join(&self.input_base);
        let rel_path = match path.strip_prefix(&base) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => path.file_name().map(PathBuf::from).unwrap_or_default(),
        };

        let input = TransformInput {
            path: path.to_path_buf(),
            rel_path,
            contents,
        };

        let artifacts = self.transform.apply(&input).await.map_err(|e| {
            fail(
                Stage::Transform(self.transform.kind().to_string()),
                format!("{e:#}"),
            )
        })?;

        let dest = root.join(&self.spec.dest);
        let mut written = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let rel = match &self.spec.rename {
                Some(rename) => apply_rename(&artifact.rel_path, rename),
                None => artifact.rel_path,
            };
            if !stays_inside(&rel) {
                return Err(fail(
                    Stage::Write,
                    format!("artifact path {} escapes {}", rel.display(), dest.display()),
                ));
            }
            let out = dest.join(rel);
            fs.write(&out, &artifact.contents)
                .map_err(|e| fail(Stage::Write, format!("{e:#}")))?;
            debug!(task = %self.name(), output = ?out, bytes = artifact.contents.len(), "wrote artifact");
            written.push(WrittenFile {
                path: out,
                bytes: artifact.contents.len() as u64,
            });
        }

        Ok(written)
    }
}

/// True when `rel` is a plain relative path that cannot leave its base.
fn stays_inside(rel: &Path) -> bool {
    rel.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
