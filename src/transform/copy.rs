// src/transform/copy.rs

use super::{Artifact, Transform, TransformFuture, TransformInput};

/// Emits the input unchanged under the same relative path.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyTransform;

impl Transform for CopyTransform {
    fn kind(&self) -> &str {
        "copy"
    }

    fn apply<'a>(&'a self, input: &'a TransformInput) -> TransformFuture<'a> {
        Box::pin(async move {
            Ok(vec![Artifact::new(
                input.rel_path.clone(),
                input.contents.clone(),
            )])
        })
    }
}
