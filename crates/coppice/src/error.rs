//! Facade error type.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Any error surfaced by the coppice facade.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Workspace discovery or manifest reading failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Workspace(#[from] coppice_workspace::Error),

    /// Closure resolution failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] coppice_graph::Error),

    /// Source filtering failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Filter(#[from] coppice_filter::Error),

    /// Build orchestration failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] coppice_build::Error),

    /// The scratch directory for derived trees could not be created.
    #[error("Failed to create scratch directory under {path}", path = path.display())]
    #[diagnostic(
        code(coppice::scratch_dir),
        help("Filtered trees are derived into a temporary directory; check disk space and permissions")
    )]
    Scratch {
        /// Parent path where the scratch directory was requested.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
