//! The build executor seam and artifact identity.
//!
//! The executor is an external collaborator: it compiles a source snapshot
//! into an artifact and manages its own artifact cache. This layer only
//! guarantees that identical (tree hash, stage spec) pairs are safe to treat
//! as cache-equivalent.

use coppice_filter::FilteredTree;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// The two build stages of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Compile only the external dependency set; workspace-local package
    /// source is never compiled in this stage.
    DepsOnly,
    /// Compile the package itself, on top of its dependency artifact.
    Full,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepsOnly => write!(f, "deps-only"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// Content-derived identity of an artifact.
///
/// Two artifacts with equal ids were produced from equivalent inputs and are
/// interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Identity of a dependency artifact.
    ///
    /// Keyed on the external dependency declarations alone, so the artifact
    /// is shared between packages with identical relevant dependency sets
    /// and survives any source edit that leaves the declarations unchanged.
    #[must_use]
    pub fn for_dependency_set(external_deps: &BTreeSet<String>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"deps-only");
        hasher.update([0]);
        for decl in external_deps {
            hasher.update(decl.as_bytes());
            hasher.update([0]);
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Identity of a full package artifact.
    ///
    /// Keyed on the package, the content hash of its filtered tree, and the
    /// dependency artifact it builds on.
    #[must_use]
    pub fn for_package(package: &str, tree_hash: &str, deps_artifact: &ArtifactId) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"full");
        hasher.update([0]);
        hasher.update(package.as_bytes());
        hasher.update([0]);
        hasher.update(tree_hash.as_bytes());
        hasher.update([0]);
        hasher.update(deps_artifact.as_str().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// The hex-encoded id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the executor is asked to compile from a filtered tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// The package the build is for.
    pub package: String,
    /// Which stage to run.
    pub stage: Stage,
    /// Cache identity of the requested artifact.
    pub id: ArtifactId,
    /// For [`Stage::Full`], the dependency artifact to build on.
    pub deps_artifact: Option<ArtifactId>,
}

/// A build output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Cache identity of the artifact.
    pub id: ArtifactId,
    /// The package the artifact belongs to.
    pub package: String,
    /// The stage that produced it.
    pub stage: Stage,
}

/// Failure reported by the build executor.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ExecutorError {
    /// The executor's failure message.
    pub message: String,
}

impl ExecutorError {
    /// Wrap an executor failure message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// External collaborator that compiles a source snapshot into an artifact.
///
/// Implementations manage their own caching and retry policy; this layer
/// issues build requests and awaits results, exposing no independent
/// cancellation token.
pub trait BuildExecutor: Send + Sync {
    /// Build the artifact described by `spec` from the given tree.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] when the underlying build fails.
    fn build_artifact(
        &self,
        tree: &FilteredTree,
        spec: &StageSpec,
    ) -> std::result::Result<Artifact, ExecutorError>;
}
