//! Filtered tree handle and content hashing.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A derived, read-only copy of the workspace limited to one target set.
///
/// The tree is content-addressed: two trees with equal [`hash`] values are
/// byte-identical and safe to treat as cache-equivalent. The copy is
/// disposable; it is consumed by the artifact builder and never mutated in
/// place.
///
/// [`hash`]: FilteredTree::hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredTree {
    root: PathBuf,
    packages: BTreeSet<String>,
    hash: String,
}

impl FilteredTree {
    pub(crate) fn new(root: PathBuf, packages: BTreeSet<String>, hash: String) -> Self {
        Self {
            root,
            packages,
            hash,
        }
    }

    /// Root directory of the derived copy.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The target package set this tree was derived for.
    #[must_use]
    pub fn packages(&self) -> &BTreeSet<String> {
        &self.packages
    }

    /// Hex-encoded content hash over every file in the tree.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

/// Compute a deterministic content hash over every file under `root`.
///
/// Files are visited in sorted path order; each contributes its root-relative
/// path (with `/` separators) and its content, so the hash is independent of
/// where the tree lives on disk.
///
/// # Errors
///
/// Returns [`Error::Io`] when the tree cannot be read.
pub fn hash_tree(root: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
            Error::io(e.into(), path, "walking filtered tree")
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or_else(|_| entry.path());
        hasher.update(portable_path(rel).as_bytes());
        hasher.update([0]);
        let content = fs::read(entry.path())
            .map_err(|e| Error::io(e, entry.path(), "reading file for hashing"))?;
        hasher.update(&content);
        hasher.update([0]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Render a relative path with `/` separators regardless of platform.
pub(crate) fn portable_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
