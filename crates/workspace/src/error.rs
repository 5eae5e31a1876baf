//! Error types for workspace discovery and manifest reading.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for workspace operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during workspace discovery and manifest reading.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The workspace manifest itself is missing.
    #[error("Workspace manifest not found at {path}")]
    #[diagnostic(
        code(coppice::workspace::workspace_manifest_not_found),
        help("The workspace root must contain a manifest listing its member packages")
    )]
    WorkspaceManifestNotFound {
        /// The path where the workspace manifest was expected.
        path: PathBuf,
    },

    /// The workspace manifest could not be parsed.
    #[error("Failed to parse workspace manifest at {path}")]
    #[diagnostic(
        code(coppice::workspace::workspace_manifest_parse),
        help("Check the workspace manifest for TOML syntax errors")
    )]
    WorkspaceManifestParse {
        /// Path to the workspace manifest.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A member pattern named a path that does not exist.
    #[error("Member pattern '{pattern}' does not match an existing directory at {path}")]
    #[diagnostic(
        code(coppice::workspace::member_path_not_found),
        help("Check the member paths declared in the workspace manifest against the source tree")
    )]
    MemberPathNotFound {
        /// The offending member pattern.
        pattern: String,
        /// The filesystem path that was probed.
        path: PathBuf,
    },

    /// A member pattern is not valid glob syntax.
    #[error("Invalid member pattern '{pattern}'")]
    #[diagnostic(code(coppice::workspace::invalid_member_pattern))]
    InvalidMemberPattern {
        /// The offending member pattern.
        pattern: String,
        /// The underlying glob error.
        #[source]
        source: glob::PatternError,
    },

    /// Two resolved member paths share the same package name.
    #[error("Two workspace members resolve to the package name '{name}': {first} and {second}",
        first = first.display(), second = second.display())]
    #[diagnostic(
        code(coppice::workspace::ambiguous_package_name),
        help("Package identity is the member directory basename; rename one of the directories")
    )]
    AmbiguousPackageName {
        /// The duplicated package name.
        name: String,
        /// Member path that claimed the name first.
        first: PathBuf,
        /// Member path that collided with it.
        second: PathBuf,
    },

    /// A member package has no manifest.
    #[error("Manifest for package '{package}' not found at {path}")]
    #[diagnostic(
        code(coppice::workspace::manifest_not_found),
        help("Every member package must have a manifest at its root")
    )]
    ManifestNotFound {
        /// Name of the package missing its manifest.
        package: String,
        /// The path where the manifest was expected.
        path: PathBuf,
    },

    /// A package manifest could not be parsed.
    #[error("Failed to parse manifest for package '{package}' at {path}")]
    #[diagnostic(
        code(coppice::workspace::manifest_parse),
        help("Check the package manifest for TOML syntax errors")
    )]
    ManifestParse {
        /// Name of the package whose manifest is malformed.
        package: String,
        /// Path to the malformed manifest.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A dependency specification has a shape the reader cannot interpret.
    #[error("Invalid specification for dependency '{dependency}' of package '{package}'")]
    #[diagnostic(
        code(coppice::workspace::invalid_dependency_spec),
        help("Dependency values must be a version string or a table")
    )]
    InvalidDependencySpec {
        /// Name of the package declaring the dependency.
        package: String,
        /// Name of the dependency with the invalid specification.
        dependency: String,
    },

    /// I/O error occurred.
    #[error("I/O error during {operation} at {path}", path = path.display())]
    #[diagnostic(
        code(coppice::workspace::io_error),
        help("Check that the path exists and that you have permission to read it")
    )]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Path where the error occurred.
        path: PathBuf,
        /// Description of the operation being performed.
        operation: String,
    },
}

impl Error {
    /// Create an I/O error with path context.
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: path.into(),
            operation: operation.into(),
        }
    }

    /// Whether this error invalidates only the affected package's manifest,
    /// as opposed to the workspace configuration as a whole.
    ///
    /// Parse-class errors are fatal for the declaring package but must not
    /// stop sibling packages from resolving and building.
    #[must_use]
    pub fn is_manifest_error(&self) -> bool {
        matches!(
            self,
            Self::ManifestParse { .. } | Self::InvalidDependencySpec { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_member_path_not_found_display() {
        let error = Error::MemberPathNotFound {
            pattern: "crates/*".to_string(),
            path: PathBuf::from("/ws/crates"),
        };

        let message = error.to_string();
        assert!(message.contains("crates/*"));
        assert!(message.contains("/ws/crates"));
    }

    #[test]
    fn test_ambiguous_package_name_display() {
        let error = Error::AmbiguousPackageName {
            name: "util".to_string(),
            first: PathBuf::from("crates/util"),
            second: PathBuf::from("tools/util"),
        };

        let message = error.to_string();
        assert!(message.contains("'util'"));
        assert!(message.contains("crates/util"));
        assert!(message.contains("tools/util"));
    }

    #[test]
    fn test_manifest_parse_is_manifest_error() {
        let source = toml::from_str::<toml::Value>("not valid = [").unwrap_err();
        let error = Error::ManifestParse {
            package: "pkg-a".to_string(),
            path: PathBuf::from("crates/pkg-a/Cargo.toml"),
            source,
        };

        assert!(error.is_manifest_error());
        assert!(error.to_string().contains("pkg-a"));
    }

    #[test]
    fn test_manifest_not_found_is_configuration_error() {
        let error = Error::ManifestNotFound {
            package: "pkg-a".to_string(),
            path: PathBuf::from("crates/pkg-a/Cargo.toml"),
        };

        assert!(!error.is_manifest_error());
    }

    #[test]
    fn test_diagnostic_codes() {
        use miette::Diagnostic;

        let error = Error::WorkspaceManifestNotFound {
            path: PathBuf::from("/ws/Cargo.toml"),
        };
        assert_eq!(
            error.code().map(|c| c.to_string()),
            Some("coppice::workspace::workspace_manifest_not_found".to_string())
        );

        let error = Error::AmbiguousPackageName {
            name: "util".to_string(),
            first: PathBuf::from("a/util"),
            second: PathBuf::from("b/util"),
        };
        assert!(error.code().is_some());
        assert!(error.help().is_some());
    }
}
