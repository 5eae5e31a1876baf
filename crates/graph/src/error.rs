//! Error types for graph construction and closure resolution.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building the package graph or resolving
/// closures over it.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A closure was requested for a name that is not a workspace package.
    #[error("Package '{package}' is not a workspace member")]
    #[diagnostic(
        code(coppice::graph::unknown_package),
        help("Closures can only be resolved for packages enumerated by the workspace index")
    )]
    UnknownPackage {
        /// The requested package name.
        package: String,
    },

    /// The local dependency graph contains a cycle.
    ///
    /// The cycle is reported in traversal order, with the entry package
    /// repeated at the end.
    #[error("Cyclic dependency between workspace packages: {}", cycle.join(" -> "))]
    #[diagnostic(
        code(coppice::graph::cyclic_dependency),
        help("Break the cycle by removing one of the local dependency declarations")
    )]
    CyclicDependency {
        /// Every package on the cycle, in order.
        cycle: Vec<String>,
    },

    /// The requested package, or a member of its closure, has a manifest
    /// that could not be parsed.
    #[error("Package '{package}' has an unusable manifest: {message}")]
    #[diagnostic(
        code(coppice::graph::unusable_manifest),
        help("Fix the package's manifest; unaffected packages continue to resolve")
    )]
    UnusableManifest {
        /// The package with the unusable manifest.
        package: String,
        /// The underlying parse failure.
        message: String,
    },

    /// A workspace-layer error surfaced while reading manifests.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Workspace(#[from] coppice_workspace::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_dependency_names_full_cycle() {
        let error = Error::CyclicDependency {
            cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };

        assert_eq!(
            error.to_string(),
            "Cyclic dependency between workspace packages: a -> b -> a"
        );
    }

    #[test]
    fn test_unknown_package_display() {
        let error = Error::UnknownPackage {
            package: "missing".to_string(),
        };

        assert!(error.to_string().contains("'missing'"));
    }

    #[test]
    fn test_diagnostic_codes() {
        use miette::Diagnostic;

        let error = Error::UnknownPackage {
            package: "missing".to_string(),
        };
        assert_eq!(
            error.code().map(|c| c.to_string()),
            Some("coppice::graph::unknown_package".to_string())
        );
    }
}
