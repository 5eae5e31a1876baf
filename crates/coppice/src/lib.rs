//! Workspace-pruning build orchestration.
//!
//! coppice determines, for each package in a multi-package workspace, exactly
//! which other packages and external libraries it needs, filters the source
//! tree down to that minimal set, and drives cached builds in two layers
//! (external dependencies, then package code) so that modifying one package
//! never invalidates the cached build of an unrelated package.
//!
//! The manifests are the single source of truth: the package graph, closures,
//! filtered trees, and artifact identities are all recomputed from them on
//! every run; nothing is persisted by this layer.
//!
//! # Example
//!
//! ```rust,ignore
//! use coppice::Coppice;
//!
//! let workspace = Coppice::open("/path/to/workspace")?;
//! let closure = workspace.resolve("pkg-b")?;
//! let artifact = workspace.build(&executor, "pkg-b")?;
//! let report = workspace.build_all(&executor)?;
//! ```

mod error;

pub use error::{Error, Result};

pub use coppice_build::{
    Artifact, ArtifactBuilder, ArtifactId, BuildExecutor, BuildOutcome, BuildReport,
    ExecutorError, Stage, StageSpec,
};
pub use coppice_filter::{FilteredTree, SourceFilter, hash_tree};
pub use coppice_graph::PackageGraph;
pub use coppice_workspace::{DependencyDecl, DependencySpec, Package, WorkspaceIndex};

use coppice_workspace::ManifestReader;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing::info;

/// Handle to an opened workspace.
///
/// Holds the workspace index and manifest reader plus a temporary scratch
/// directory that filtered trees are derived into. The scratch directory is
/// removed when the handle is dropped.
pub struct Coppice {
    reader: ManifestReader,
    index: WorkspaceIndex,
    scratch: TempDir,
    filter_seq: AtomicUsize,
}

impl Coppice {
    /// Open the workspace rooted at `root`.
    ///
    /// Reads the workspace manifest and enumerates member packages. Member
    /// manifests are not read here; they are read by the operation that
    /// needs them, so a broken member manifest does not prevent opening.
    ///
    /// # Errors
    ///
    /// Fails when the workspace manifest is missing or malformed, when a
    /// member pattern matches nothing, or when the scratch directory cannot
    /// be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let reader = ManifestReader::new(root)?;
        let index = WorkspaceIndex::discover(root, reader.members())?;
        let scratch = TempDir::new().map_err(|source| Error::Scratch {
            path: std::env::temp_dir(),
            source,
        })?;
        info!(
            root = %root.display(),
            members = index.len(),
            "workspace opened"
        );
        Ok(Self {
            reader,
            index,
            scratch,
            filter_seq: AtomicUsize::new(0),
        })
    }

    /// The workspace index.
    #[must_use]
    pub fn index(&self) -> &WorkspaceIndex {
        &self.index
    }

    /// Resolve the transitive closure of local dependencies for one package.
    ///
    /// The graph is rebuilt from the manifests on every call.
    ///
    /// # Errors
    ///
    /// Fails on unknown packages, dependency cycles (reported with the
    /// complete cycle path), and manifests that cannot be parsed — but a
    /// broken manifest is fatal only for closures that touch its package;
    /// unrelated packages resolve normally.
    pub fn resolve(&self, package: &str) -> Result<BTreeSet<String>> {
        let graph = PackageGraph::from_workspace(&self.index, &self.reader)?;
        Ok(graph.resolve_closure(package)?)
    }

    /// Derive a minimal source tree for a target package set.
    ///
    /// The tree is written under this handle's scratch directory and lives
    /// until the handle is dropped.
    ///
    /// # Errors
    ///
    /// Fails when the target set names a non-member or the tree cannot be
    /// derived.
    pub fn filter(&self, packages: &BTreeSet<String>) -> Result<FilteredTree> {
        let seq = self.filter_seq.fetch_add(1, Ordering::Relaxed);
        let dest = self.scratch.path().join(format!("filter-{seq}"));
        Ok(SourceFilter::new(&self.index).filter_tree(packages, &dest)?)
    }

    /// Create an artifact builder bound to the given executor.
    ///
    /// The builder caches artifacts by identity for its own lifetime, so
    /// callers issuing several builds should reuse one builder.
    ///
    /// # Errors
    ///
    /// Fails on workspace configuration errors; per-package manifest parse
    /// errors are tolerated and surface when the affected package is built.
    pub fn builder<'a>(&'a self, executor: &'a dyn BuildExecutor) -> Result<ArtifactBuilder<'a>> {
        Ok(ArtifactBuilder::new(
            &self.index,
            &self.reader,
            executor,
            self.scratch.path().join("build"),
        )?)
    }

    /// Build the full artifact for one package.
    ///
    /// # Errors
    ///
    /// Fails on configuration errors, cycles, unusable manifests in the
    /// package's closure, and executor failures.
    pub fn build(&self, executor: &dyn BuildExecutor, package: &str) -> Result<Artifact> {
        Ok(self.builder(executor)?.build(package)?)
    }

    /// Build every package in the workspace, leaves first.
    ///
    /// Individual failures do not fail the run; they are recorded in the
    /// report, and dependents of a failed package are marked blocked.
    ///
    /// # Errors
    ///
    /// Fails on configuration errors and dependency cycles.
    pub fn build_all(&self, executor: &dyn BuildExecutor) -> Result<BuildReport> {
        Ok(self.builder(executor)?.build_all()?)
    }
}
