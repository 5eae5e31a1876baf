//! Two-stage cached artifact building for coppice.
//!
//! Orchestrates the build of each package in two stages against an external
//! build executor: a `DepsOnly` stage that compiles only the package's
//! external dependency set, then a `Full` stage that compiles the package on
//! top of it. Stage identities are content-derived so the executor can treat
//! identical requests as cache hits, and the dependency artifact survives any
//! source edit that leaves dependency declarations unchanged.
//!
//! # Core Types
//!
//! - [`BuildExecutor`] - The seam to the external compiler/cache
//! - [`ArtifactBuilder`] - Per-package and whole-workspace orchestration
//! - [`StageSpec`] / [`Artifact`] / [`ArtifactId`] - What is requested and
//!   what comes back
//! - [`BuildReport`] / [`BuildOutcome`] - Built / failed / blocked per
//!   package for workspace-wide runs

mod builder;
mod error;
mod executor;

pub use builder::{ArtifactBuilder, BuildOutcome, BuildReport};
pub use error::{Error, Result};
pub use executor::{Artifact, ArtifactId, BuildExecutor, ExecutorError, Stage, StageSpec};
