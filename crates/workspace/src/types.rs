//! Core types shared across the workspace crate.

use std::fmt;
use std::path::PathBuf;

/// File name of the workspace and package manifests.
pub const MANIFEST_FILE: &str = "Cargo.toml";

/// A member package of the workspace.
///
/// Identity is the unique package name; the root path is always relative to
/// the workspace root. Packages are produced by [`WorkspaceIndex`] enumeration
/// and are immutable for the duration of one resolution run.
///
/// [`WorkspaceIndex`]: crate::WorkspaceIndex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Unique package name (the member directory basename).
    pub name: String,
    /// Package root, relative to the workspace root.
    pub root: PathBuf,
}

impl Package {
    /// Path to this package's manifest, relative to the workspace root.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }
}

/// How a dependency is specified in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DependencySpec {
    /// A local-path specification (`{ path = "..." }`), possibly inherited
    /// from the root `[workspace.dependencies]` table.
    Path(PathBuf),
    /// A registry specification: the bare version requirement, or the
    /// canonical rendering of a detailed table without a path marker. The
    /// rendering covers every key of the declaration (version, features,
    /// `default-features`, git refs), so editing any of them yields a
    /// distinct spec and therefore a distinct declaration summary.
    Registry(String),
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "path:{}", path.display()),
            Self::Registry(req) => write!(f, "registry:{req}"),
        }
    }
}

/// A single dependency declaration extracted from a package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDecl {
    /// Name the dependency is declared under.
    pub name: String,
    /// The declared specification.
    pub spec: DependencySpec,
}

impl DependencyDecl {
    /// Whether the declaration carries a local-path marker.
    ///
    /// This is a statement about the declaration only; whether the name also
    /// matches a known workspace package is decided by the closure resolver
    /// against the workspace index.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self.spec, DependencySpec::Path(_))
    }

    /// Stable one-line rendering of the declaration, used for cache keys.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{} {}", self.name, self.spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_path() {
        let package = Package {
            name: "pkg-a".to_string(),
            root: PathBuf::from("crates/pkg-a"),
        };
        assert_eq!(
            package.manifest_path(),
            PathBuf::from("crates/pkg-a/Cargo.toml")
        );
    }

    #[test]
    fn test_is_local() {
        let local = DependencyDecl {
            name: "pkg-a".to_string(),
            spec: DependencySpec::Path(PathBuf::from("../pkg-a")),
        };
        let external = DependencyDecl {
            name: "serde".to_string(),
            spec: DependencySpec::Registry("1.0".to_string()),
        };

        assert!(local.is_local());
        assert!(!external.is_local());
    }

    #[test]
    fn test_summary_is_stable() {
        let decl = DependencyDecl {
            name: "serde".to_string(),
            spec: DependencySpec::Registry("1.0".to_string()),
        };
        assert_eq!(decl.summary(), "serde registry:1.0");

        let decl = DependencyDecl {
            name: "pkg-a".to_string(),
            spec: DependencySpec::Path(PathBuf::from("../pkg-a")),
        };
        assert_eq!(decl.summary(), "pkg-a path:../pkg-a");
    }
}
