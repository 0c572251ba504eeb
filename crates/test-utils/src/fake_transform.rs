use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetflow::transform::{Artifact, Transform, TransformFuture, TransformInput};

/// A transform that:
/// - records every input it was applied to (by path relative to the glob base)
/// - fails for inputs whose file name is in `fail_on`
/// - otherwise uppercases ASCII contents into an artifact at the same path.
#[derive(Debug, Clone, Default)]
pub struct FakeTransform {
    calls: Arc<Mutex<Vec<PathBuf>>>,
    fail_on: Arc<Mutex<BTreeSet<String>>>,
    delay: Option<Duration>,
}

impl FakeTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_on(&self, file_name: &str) {
        self.fail_on.lock().unwrap().insert(file_name.to_string());
    }

    pub fn stop_failing(&self, file_name: &str) {
        self.fail_on.lock().unwrap().remove(file_name);
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl Transform for FakeTransform {
    fn kind(&self) -> &str {
        "fake"
    }

    fn apply<'a>(&'a self, input: &'a TransformInput) -> TransformFuture<'a> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.calls.lock().unwrap().push(input.rel_path.clone());

            let name = input
                .rel_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if self.fail_on.lock().unwrap().contains(&name) {
                anyhow::bail!("fake failure for {name}");
            }

            Ok(vec![Artifact::new(
                input.rel_path.clone(),
                input.contents.to_ascii_uppercase(),
            )])
        })
    }
}
