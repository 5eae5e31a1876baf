//! Error types for source filtering.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for filter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while deriving a filtered source tree.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The target set names a package that is not a workspace member.
    #[error("Cannot filter for unknown package '{package}'")]
    #[diagnostic(
        code(coppice::filter::unknown_package),
        help("Filter target sets may only contain workspace member packages")
    )]
    UnknownPackage {
        /// The offending package name.
        package: String,
    },

    /// The workspace manifest could not be parsed for member narrowing.
    #[error("Failed to parse workspace manifest at {path} for member narrowing")]
    #[diagnostic(
        code(coppice::filter::manifest_synthesis),
        help("The workspace manifest must be valid TOML with a [workspace] table")
    )]
    ManifestSynthesis {
        /// Path to the workspace manifest.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: toml_edit::TomlError,
    },

    /// The workspace manifest has no `[workspace]` table to narrow.
    #[error("Workspace manifest at {path} has no [workspace] table")]
    #[diagnostic(code(coppice::filter::missing_workspace_table))]
    MissingWorkspaceTable {
        /// Path to the workspace manifest.
        path: PathBuf,
    },

    /// I/O error occurred.
    #[error("I/O error during {operation} at {path}", path = path.display())]
    #[diagnostic(
        code(coppice::filter::io_error),
        help("Check that the path exists and that you have permission to access it")
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
}
