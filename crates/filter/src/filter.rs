//! Minimal source-tree derivation.
//!
//! Filtering is a pure function from (workspace tree, target set) to a
//! derived copy: it never mutates the workspace in place, so concurrent
//! filtering for different target sets cannot race.

use crate::error::{Error, Result};
use crate::tree::{FilteredTree, hash_tree, portable_path};
use coppice_workspace::{MANIFEST_FILE, WorkspaceIndex};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use toml_edit::DocumentMut;
use tracing::debug;
use walkdir::WalkDir;

/// Directories never copied into a filtered tree: build outputs and
/// version-control metadata, matching what the build executor already
/// ignores for ordinary source.
const IGNORED_DIRS: [&str; 5] = [".git", ".hg", ".jj", "target", "node_modules"];

/// Derives minimal source trees for target package sets.
pub struct SourceFilter<'a> {
    index: &'a WorkspaceIndex,
}

impl<'a> SourceFilter<'a> {
    /// Create a filter over the given workspace index.
    #[must_use]
    pub fn new(index: &'a WorkspaceIndex) -> Self {
        Self { index }
    }

    /// Derive a minimal copy of the workspace under `dest`, limited to the
    /// target packages.
    ///
    /// Inclusion policy, in priority order for every entry relative to the
    /// workspace root:
    ///
    /// 1. Entries inside a package directory whose package is not in the
    ///    target set are excluded entirely.
    /// 2. Root-level files other than the workspace manifest are copied
    ///    verbatim.
    /// 3. Ancestor directories of target packages are materialized as
    ///    needed.
    /// 4. Everything else is copied unless it falls under an ignored
    ///    directory (build outputs, version-control metadata).
    ///
    /// The workspace manifest is synthesized rather than copied: its member
    /// list is narrowed to exactly the target set, all other fields pass
    /// through unchanged. A file inside a package outside the target set can
    /// therefore never change the derived tree's content hash.
    ///
    /// A pre-existing `dest` is removed first, so the tree and its hash
    /// reflect only this derivation and never leftovers from an earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPackage`] when the target set names a
    /// non-member, [`Error::ManifestSynthesis`] when the workspace manifest
    /// cannot be narrowed, and [`Error::Io`] on filesystem failures.
    pub fn filter_tree(&self, targets: &BTreeSet<String>, dest: &Path) -> Result<FilteredTree> {
        for name in targets {
            if !self.index.contains(name) {
                return Err(Error::UnknownPackage {
                    package: name.clone(),
                });
            }
        }

        let root = self.index.root();
        if dest.exists() {
            fs::remove_dir_all(dest)
                .map_err(|e| Error::io(e, dest, "clearing filtered tree destination"))?;
        }
        fs::create_dir_all(dest).map_err(|e| Error::io(e, dest, "creating filtered tree root"))?;

        let mut copied = 0_usize;
        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let Ok(rel) = entry.path().strip_prefix(root) else {
                    return false;
                };
                if entry.file_type().is_dir()
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| IGNORED_DIRS.contains(&name))
                {
                    return false;
                }
                match self.index.package_containing(rel) {
                    Some(package) => targets.contains(&package.name),
                    None => true,
                }
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                Error::io(e.into(), path, "walking workspace")
            })?;
            let rel = match entry.path().strip_prefix(root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            if entry.file_type().is_dir() {
                continue;
            }
            // The workspace manifest is synthesized below, never copied.
            if rel == Path::new(MANIFEST_FILE) {
                continue;
            }
            let target_path = dest.join(rel);
            if let Some(parent) = target_path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::io(e, parent, "creating filtered tree directory"))?;
            }
            fs::copy(entry.path(), &target_path)
                .map_err(|e| Error::io(e, entry.path(), "copying source file"))?;
            copied += 1;
        }

        self.synthesize_manifest(targets, dest)?;
        let hash = hash_tree(dest)?;

        debug!(
            targets = targets.len(),
            files = copied,
            hash = %hash,
            "derived filtered tree"
        );
        Ok(FilteredTree::new(dest.to_path_buf(), targets.clone(), hash))
    }

    /// Write the narrowed workspace manifest into the filtered tree.
    ///
    /// Format-preserving: only the member list is rewritten.
    fn synthesize_manifest(&self, targets: &BTreeSet<String>, dest: &Path) -> Result<()> {
        let manifest_path = self.index.root().join(MANIFEST_FILE);
        let content = fs::read_to_string(&manifest_path)
            .map_err(|e| Error::io(e, &manifest_path, "reading workspace manifest"))?;
        let mut doc: DocumentMut =
            content
                .parse()
                .map_err(|source| Error::ManifestSynthesis {
                    path: manifest_path.clone(),
                    source,
                })?;

        let mut members = toml_edit::Array::new();
        for name in targets {
            // Targets were validated against the index above.
            if let Some(package) = self.index.get(name) {
                members.push(portable_path(&package.root));
            }
        }

        let Some(workspace) = doc
            .get_mut("workspace")
            .and_then(toml_edit::Item::as_table_like_mut)
        else {
            return Err(Error::MissingWorkspaceTable {
                path: manifest_path,
            });
        };
        workspace.insert("members", toml_edit::value(members));

        let out_path = dest.join(MANIFEST_FILE);
        fs::write(&out_path, doc.to_string())
            .map_err(|e| Error::io(e, &out_path, "writing synthesized manifest"))?;
        Ok(())
    }
}
