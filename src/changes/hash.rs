// src/changes/hash.rs

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Content signature of a file: hex-encoded blake3 hash.
pub type Signature = String;

/// Compute the signature of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<Signature> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Signature of an in-memory buffer, matching [`compute_file_hash`].
pub fn compute_bytes_hash(bytes: &[u8]) -> Signature {
    blake3::hash(bytes).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn file_and_bytes_hash_agree() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/a.txt", b"hello world".to_vec());

        let from_file = compute_file_hash(&fs, Path::new("/proj/a.txt")).unwrap();
        assert_eq!(from_file, compute_bytes_hash(b"hello world"));
        assert_eq!(
            from_file,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }
}
