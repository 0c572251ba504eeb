// src/watch/path_utils.rs

use std::path::Path;

/// Render a relative path with forward slashes, the form glob patterns are
/// matched against.
pub fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

/// Convert `path` into a string relative to `root`, with forward slashes.
///
/// Falls back to comparing canonicalized paths when the direct prefix does
/// not match (symlinked roots, `/private/var` on macOS).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    None
}
