//! Workspace member enumeration.

use crate::error::{Error, Result};
use crate::types::Package;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Enumerates the member packages of a workspace and maps package names to
/// package roots.
///
/// The index is a pure read of the filesystem: it holds no derived state and
/// is rebuilt from the member patterns on every resolution run. Member
/// patterns are either explicit relative paths (`tools/codegen`) or
/// directory globs (`crates/*`), where every matching immediate subdirectory
/// becomes one member package named after its directory basename.
#[derive(Debug, Clone)]
pub struct WorkspaceIndex {
    root: PathBuf,
    packages: Vec<Package>,
    by_name: BTreeMap<String, usize>,
}

impl WorkspaceIndex {
    /// Enumerate member packages under `root` from the given member patterns.
    ///
    /// Packages are returned in pattern order; glob matches within one
    /// pattern are sorted by name for determinism.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemberPathNotFound`] when an explicit pattern path
    /// (or the parent directory of a glob pattern) does not exist, and
    /// [`Error::AmbiguousPackageName`] when two resolved member paths share
    /// a directory basename.
    pub fn discover(root: impl AsRef<Path>, member_patterns: &[String]) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut packages: Vec<Package> = Vec::new();
        let mut by_name: BTreeMap<String, usize> = BTreeMap::new();

        for pattern in member_patterns {
            let mut matches = resolve_pattern(&root, pattern)?;
            matches.sort();

            for member_root in matches {
                let name = package_name(pattern, &member_root)?;
                if let Some(&existing) = by_name.get(&name) {
                    return Err(Error::AmbiguousPackageName {
                        name,
                        first: packages[existing].root.clone(),
                        second: member_root,
                    });
                }
                debug!(package = %name, path = %member_root.display(), "discovered workspace member");
                by_name.insert(name.clone(), packages.len());
                packages.push(Package {
                    name,
                    root: member_root,
                });
            }
        }

        debug!(members = packages.len(), root = %root.display(), "workspace index built");
        Ok(Self {
            root,
            packages,
            by_name,
        })
    }

    /// The workspace root path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All member packages, in discovery order.
    #[must_use]
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Look up a package by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Package> {
        self.by_name.get(name).map(|&idx| &self.packages[idx])
    }

    /// Whether a package with this name is a workspace member.
    ///
    /// Absence from the index is the defining test for an external
    /// dependency.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The package whose directory contains `rel_path`, if any.
    ///
    /// `rel_path` must be relative to the workspace root. The longest
    /// matching package root wins, so nested member layouts resolve to the
    /// innermost package.
    #[must_use]
    pub fn package_containing(&self, rel_path: &Path) -> Option<&Package> {
        self.packages
            .iter()
            .filter(|pkg| rel_path.starts_with(&pkg.root))
            .max_by_key(|pkg| pkg.root.components().count())
    }

    /// Number of member packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the workspace has no member packages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Expand one member pattern into member root paths relative to `root`.
fn resolve_pattern(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !pattern.contains('*') {
        let path = root.join(pattern);
        if !path.is_dir() {
            return Err(Error::MemberPathNotFound {
                pattern: pattern.to_string(),
                path,
            });
        }
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let (dir, leaf) = pattern.rsplit_once('/').unwrap_or(("", pattern));
    let parent = if dir.is_empty() {
        root.to_path_buf()
    } else {
        root.join(dir)
    };
    if !parent.is_dir() {
        return Err(Error::MemberPathNotFound {
            pattern: pattern.to_string(),
            path: parent,
        });
    }

    let matcher = glob::Pattern::new(leaf).map_err(|source| Error::InvalidMemberPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let entries = fs::read_dir(&parent).map_err(|e| Error::io(e, &parent, "reading member directory"))?;
    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(e, &parent, "reading member directory"))?;
        if !entry.path().is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if matcher.matches(name) {
            matches.push(if dir.is_empty() {
                PathBuf::from(name)
            } else {
                Path::new(dir).join(name)
            });
        }
    }
    Ok(matches)
}

/// Package identity is the member directory basename.
fn package_name(pattern: &str, member_root: &Path) -> Result<String> {
    member_root
        .file_name()
        .and_then(|name| name.to_str())
        .map(String::from)
        .ok_or_else(|| Error::MemberPathNotFound {
            pattern: pattern.to_string(),
            path: member_root.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn strings(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_discover_explicit_members() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("crates/pkg-a")).unwrap();
        fs::create_dir_all(root.join("tools/codegen")).unwrap();

        let index =
            WorkspaceIndex::discover(root, &strings(&["crates/pkg-a", "tools/codegen"])).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.packages()[0].name, "pkg-a");
        assert_eq!(index.packages()[1].name, "codegen");
        assert_eq!(index.packages()[0].root, PathBuf::from("crates/pkg-a"));
    }

    #[test]
    fn test_discover_glob_members() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("crates/pkg-b")).unwrap();
        fs::create_dir_all(root.join("crates/pkg-a")).unwrap();
        fs::write(root.join("crates/README.md"), "not a package").unwrap();

        let index = WorkspaceIndex::discover(root, &strings(&["crates/*"])).unwrap();

        // Files under the glob parent are ignored; directories sort by name
        assert_eq!(index.len(), 2);
        assert_eq!(index.packages()[0].name, "pkg-a");
        assert_eq!(index.packages()[1].name, "pkg-b");
    }

    #[test]
    fn test_discover_missing_explicit_member() {
        let temp_dir = TempDir::new().unwrap();

        let result = WorkspaceIndex::discover(temp_dir.path(), &strings(&["crates/missing"]));

        assert!(matches!(
            result,
            Err(Error::MemberPathNotFound { pattern, .. }) if pattern == "crates/missing"
        ));
    }

    #[test]
    fn test_discover_missing_glob_parent() {
        let temp_dir = TempDir::new().unwrap();

        let result = WorkspaceIndex::discover(temp_dir.path(), &strings(&["crates/*"]));

        assert!(matches!(result, Err(Error::MemberPathNotFound { .. })));
    }

    #[test]
    fn test_discover_duplicate_package_name() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("crates/util")).unwrap();
        fs::create_dir_all(root.join("tools/util")).unwrap();

        let result = WorkspaceIndex::discover(root, &strings(&["crates/*", "tools/util"]));

        assert!(matches!(
            result,
            Err(Error::AmbiguousPackageName { name, .. }) if name == "util"
        ));
    }

    #[test]
    fn test_discover_empty_glob() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("crates")).unwrap();

        let index = WorkspaceIndex::discover(root, &strings(&["crates/*"])).unwrap();

        assert!(index.is_empty());
    }

    #[test]
    fn test_lookup_and_contains() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("crates/pkg-a")).unwrap();

        let index = WorkspaceIndex::discover(root, &strings(&["crates/*"])).unwrap();

        assert!(index.contains("pkg-a"));
        assert!(!index.contains("serde"));
        assert_eq!(
            index.get("pkg-a").map(|p| p.root.clone()),
            Some(PathBuf::from("crates/pkg-a"))
        );
        assert!(index.get("missing").is_none());
    }

    #[test]
    fn test_package_containing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("crates/pkg-a")).unwrap();

        let index = WorkspaceIndex::discover(root, &strings(&["crates/*"])).unwrap();

        assert_eq!(
            index
                .package_containing(Path::new("crates/pkg-a/src/lib.rs"))
                .map(|p| p.name.as_str()),
            Some("pkg-a")
        );
        assert!(index.package_containing(Path::new("crates")).is_none());
        assert!(index.package_containing(Path::new("README.md")).is_none());
    }

    #[test]
    fn test_partial_glob_pattern() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("crates/pkg-a")).unwrap();
        fs::create_dir_all(root.join("crates/other")).unwrap();

        let index = WorkspaceIndex::discover(root, &strings(&["crates/pkg-*"])).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.packages()[0].name, "pkg-a");
    }
}
