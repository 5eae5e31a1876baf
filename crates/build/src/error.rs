//! Error types for artifact building.

use crate::executor::Stage;
use miette::Diagnostic;
use thiserror::Error;

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating builds.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The build executor reported a failure for one stage.
    #[error("Build of package '{package}' failed during {stage} stage: {message}")]
    #[diagnostic(
        code(coppice::build::build_failed),
        help("The failure comes from the external build executor; its message is reproduced above")
    )]
    Build {
        /// The package whose build failed.
        package: String,
        /// The stage that failed.
        stage: Stage,
        /// The executor's failure message.
        message: String,
    },

    /// The package's manifest could not be used, so no build was attempted.
    #[error("Cannot build package '{package}': {message}")]
    #[diagnostic(
        code(coppice::build::invalid_manifest),
        help("Fix the package manifest; sibling packages are unaffected")
    )]
    InvalidManifest {
        /// The package with the unusable manifest. May be a closure member
        /// of the package whose build was requested.
        package: String,
        /// The underlying manifest error message.
        message: String,
    },

    /// A graph-layer error surfaced during resolution.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] coppice_graph::Error),

    /// A filter-layer error surfaced while deriving the source tree.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Filter(#[from] coppice_filter::Error),

    /// A workspace-layer error surfaced while reading manifests.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Workspace(#[from] coppice_workspace::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_error_names_stage() {
        let error = Error::Build {
            package: "pkg-b".to_string(),
            stage: Stage::DepsOnly,
            message: "linker not found".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("pkg-b"));
        assert!(message.contains("deps-only"));
        assert!(message.contains("linker not found"));
    }

    #[test]
    fn test_invalid_manifest_display() {
        let error = Error::InvalidManifest {
            package: "pkg-a".to_string(),
            message: "unexpected end of input".to_string(),
        };

        assert!(error.to_string().contains("pkg-a"));
    }
}
