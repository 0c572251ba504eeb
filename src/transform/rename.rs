// src/transform/rename.rs

use std::path::{Path, PathBuf};

use crate::config::model::RenameConfig;

/// Apply `prefix`, `suffix` and `extension` to the file name of `rel`,
/// keeping its directory.
///
/// `style.scss` with `{ suffix = ".min", extension = "css" }` becomes
/// `style.min.css`.
pub fn apply_rename(rel: &Path, rename: &RenameConfig) -> PathBuf {
    let stem = rel
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let extension = match &rename.extension {
        Some(ext) => Some(ext.trim_start_matches('.').to_string()),
        None => rel.extension().map(|e| e.to_string_lossy().into_owned()),
    };

    let mut name = String::new();
    if let Some(prefix) = &rename.prefix {
        name.push_str(prefix);
    }
    name.push_str(&stem);
    if let Some(suffix) = &rename.suffix {
        name.push_str(suffix);
    }
    if let Some(ext) = extension.filter(|e| !e.is_empty()) {
        name.push('.');
        name.push_str(&ext);
    }

    match rel.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rename(prefix: Option<&str>, suffix: Option<&str>, ext: Option<&str>) -> RenameConfig {
        RenameConfig {
            prefix: prefix.map(str::to_string),
            suffix: suffix.map(str::to_string),
            extension: ext.map(str::to_string),
        }
    }

    #[test]
    fn min_suffix_with_new_extension() {
        let out = apply_rename(Path::new("style.scss"), &rename(None, Some(".min"), Some("css")));
        assert_eq!(out, PathBuf::from("style.min.css"));
    }

    #[test]
    fn keeps_directory_and_extension() {
        let out = apply_rename(Path::new("vendor/main.js"), &rename(Some("app-"), Some(".min"), None));
        assert_eq!(out, PathBuf::from("vendor/app-main.min.js"));
    }

    #[test]
    fn leading_dot_in_extension_is_ignored() {
        let out = apply_rename(Path::new("font.ttf"), &rename(None, None, Some(".woff2")));
        assert_eq!(out, PathBuf::from("font.woff2"));
    }
}
