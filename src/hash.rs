//! Source identity keys.
//!
//! A source image is identified by the xxHash64 of its canonical absolute
//! path, so `a/../a/x.png` and `a/x.png` collapse to one task. Keys render
//! as base64 of the little-endian digest for logs and as hex for temp file
//! names (base64 can contain `/`).

use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;
use std::path::Path;
use xxhash_rust::xxh64::xxh64;

/// Identity of one source file within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey(u64);

impl SourceKey {
    /// Key for a path. Falls back to the absolute (non-canonical) form when
    /// the file can't be resolved.
    pub fn for_path(path: &Path) -> Self {
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| crate::paths::absolute(path));
        Self::from_bytes(canonical.to_string_lossy().as_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        SourceKey(xxh64(bytes, 0))
    }

    /// Fixed-width lowercase hex, safe inside file names
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&STANDARD.encode(self.0.to_le_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_same_file_same_key() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let file = dir.path().join("sub").join("brick.png");
        fs::write(&file, b"png").unwrap();

        let dotted = dir.path().join("sub").join("..").join("sub").join("brick.png");
        assert_eq!(SourceKey::for_path(&file), SourceKey::for_path(&dotted));
        assert_ne!(
            SourceKey::for_path(&file),
            SourceKey::for_path(&dir.path().join("other.png"))
        );
    }

    #[test]
    fn test_key_rendering() {
        let key = SourceKey::from_bytes(b"hello");
        assert_eq!(key.to_hex().len(), 16);
        assert!(key.to_hex().chars().all(|c| c.is_ascii_hexdigit()));
        // 8 bytes -> 12 base64 chars with padding
        assert_eq!(key.to_string().len(), 12);
    }
}
