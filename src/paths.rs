//! Path helpers for batch planning
//!
//! - Splitting a wildcard "input folder" such as `textures/*.png` into its
//!   real folder and the glob
//! - Mirroring a source path from the input tree into the output tree
//! - Extension checks (case-insensitive)

use crate::job::CONTAINER_EXTENSION;
use std::path::{Path, PathBuf};

/// Characters that turn the last input component into a glob
pub const WILDCARD_CHARS: &[char] = &['*', '?', '[', ']', '{', '}', '!'];

/// Default pattern when the input folder carries none
pub const DEFAULT_PATTERN: &str = "*.*";

/// True if `s` contains any glob metacharacter
pub fn has_wildcard(s: &str) -> bool {
    s.contains(WILDCARD_CHARS)
}

/// Split `input` into (folder, pattern) when its last component is a glob.
///
/// `textures/*.png` -> (`textures`, Some(`*.png`))
/// `textures`       -> (`textures`, None)
pub fn split_wildcard(input: &Path) -> (PathBuf, Option<String>) {
    let name = input.file_name().map(|n| n.to_string_lossy().to_string());
    match name {
        Some(name) if has_wildcard(&name) => {
            let parent = input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (parent, Some(name))
        }
        _ => (input.to_path_buf(), None),
    }
}

/// Destination for `source`: its path relative to `input_root`, re-rooted
/// under `output_root`, with the container extension.
///
/// Sources outside `input_root` land directly in `output_root`.
pub fn mirror_destination(source: &Path, input_root: &Path, output_root: &Path) -> PathBuf {
    let relative = source
        .strip_prefix(input_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| source.file_name().map(PathBuf::from).unwrap_or_default());
    output_root.join(relative).with_extension(CONTAINER_EXTENSION)
}

/// Destination for a single image export: `<dir>/<stem or rename>.vtf`
pub fn single_destination(source: &Path, dest_dir: Option<&Path>, rename: Option<&str>) -> PathBuf {
    let dir = dest_dir
        .map(Path::to_path_buf)
        .or_else(|| source.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let stem = match rename {
        Some(name) => name.to_string(),
        None => file_stem(source),
    };
    dir.join(format!("{}.{}", stem, CONTAINER_EXTENSION))
}

/// File stem as an owned string (empty if none)
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Lowercase extension including the dot, e.g. `.png`
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
}

/// True if the path's extension is one of `extensions` (given with dots)
pub fn has_extension_in(path: &Path, extensions: &[&str]) -> bool {
    dotted_extension(path)
        .map(|ext| extensions.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Create parent directories for a path if they don't exist
pub fn ensure_parent_dirs(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Absolute form of a path without requiring it to exist
pub fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
