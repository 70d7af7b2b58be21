//! Relative path keys
//!
//! Files are identified across both trees by their path relative to the tree
//! root, rendered as a `/`-separated UTF-8 string. The same key maps a source
//! file onto its would-be target location.

use std::path::{Component, Path, PathBuf};

/// Build the relative key for `path` under `root`
///
/// Returns `None` when `path` is not strictly below `root`, contains
/// non-normal components, or is not valid UTF-8.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_str()?),
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Resolve a relative key back onto a root
pub fn resolve(root: &Path, key: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in key.split('/').filter(|part| !part.is_empty()) {
        path.push(part);
    }
    path
}

/// Parent key of `key`, `None` for top-level entries
pub fn parent_key(key: &str) -> Option<&str> {
    key.rsplit_once('/').map(|(parent, _)| parent)
}
