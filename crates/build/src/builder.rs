//! Two-stage build orchestration.
//!
//! The builder ties the other layers together: it resolves the closure of a
//! package, derives the filtered tree for it, and drives the external
//! executor through the `DepsOnly` and `Full` stages, caching artifacts by
//! identity within the run.

use crate::error::{Error, Result};
use crate::executor::{Artifact, ArtifactId, BuildExecutor, Stage, StageSpec};
use coppice_filter::SourceFilter;
use coppice_graph::PackageGraph;
use coppice_workspace::{ManifestReader, WorkspaceIndex};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of one package's build within a workspace-wide run.
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// The full artifact was produced.
    Built(Artifact),
    /// The build failed, or the package's manifest was unusable.
    Failed {
        /// Failure message.
        message: String,
    },
    /// A closure member failed, so no build was attempted.
    Blocked {
        /// The package whose failure blocked this one.
        failed_dependency: String,
    },
}

/// Outcome of a workspace-wide build, one entry per package.
#[derive(Debug, Default)]
pub struct BuildReport {
    outcomes: BTreeMap<String, BuildOutcome>,
}

impl BuildReport {
    /// All outcomes, keyed by package name.
    #[must_use]
    pub fn outcomes(&self) -> &BTreeMap<String, BuildOutcome> {
        &self.outcomes
    }

    /// The outcome for one package, if it was part of the run.
    #[must_use]
    pub fn get(&self, package: &str) -> Option<&BuildOutcome> {
        self.outcomes.get(package)
    }

    /// Whether every package built successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes
            .values()
            .all(|outcome| matches!(outcome, BuildOutcome::Built(_)))
    }

    /// Names of packages that failed, in sorted order.
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|(name, outcome)| {
            matches!(outcome, BuildOutcome::Failed { .. }).then_some(name.as_str())
        })
    }

    /// Names of packages that were blocked, in sorted order.
    pub fn blocked(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|(name, outcome)| {
            matches!(outcome, BuildOutcome::Blocked { .. }).then_some(name.as_str())
        })
    }
}

/// Orchestrates two-stage builds over the workspace.
///
/// Construction reads every member's manifest once. A manifest that fails to
/// parse poisons only its own package: the package is recorded as broken and
/// takes part in the graph with no dependencies, so siblings resolve and
/// build normally. Missing manifests and other configuration errors are
/// fatal for the whole run.
pub struct ArtifactBuilder<'a> {
    index: &'a WorkspaceIndex,
    executor: &'a dyn BuildExecutor,
    scratch: PathBuf,
    graph: PackageGraph,
    /// External dependency declaration summaries per package.
    external_deps: BTreeMap<String, Vec<String>>,
    /// Packages whose manifests could not be used, with the reason.
    broken: BTreeMap<String, String>,
    /// Within-run artifact cache.
    artifacts: Mutex<HashMap<ArtifactId, Artifact>>,
}

impl<'a> ArtifactBuilder<'a> {
    /// Create a builder for the workspace, deriving filtered trees under
    /// `scratch`.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors (missing manifests, I/O failures)
    /// from the workspace layer. Manifest parse errors are tolerated and
    /// recorded per package instead.
    pub fn new(
        index: &'a WorkspaceIndex,
        reader: &ManifestReader,
        executor: &'a dyn BuildExecutor,
        scratch: impl Into<PathBuf>,
    ) -> Result<Self> {
        let mut graph = PackageGraph::new();
        let mut external_deps = BTreeMap::new();
        let mut broken = BTreeMap::new();

        for package in index.packages() {
            match reader.read_dependencies(package) {
                Ok(declarations) => {
                    let (local, external): (Vec<_>, Vec<_>) =
                        declarations.into_iter().partition(|decl| decl.is_local());
                    graph.add_package(
                        &package.name,
                        local.into_iter().map(|decl| decl.name).collect(),
                    );
                    external_deps.insert(
                        package.name.clone(),
                        external.iter().map(|decl| decl.summary()).collect(),
                    );
                }
                Err(err) if err.is_manifest_error() => {
                    warn!(package = %package.name, error = %err, "manifest unusable, package excluded from building");
                    graph.add_package(&package.name, Vec::new());
                    external_deps.insert(package.name.clone(), Vec::new());
                    broken.insert(package.name.clone(), err.to_string());
                }
                Err(err) => return Err(err.into()),
            }
        }
        graph.add_dependency_edges();

        Ok(Self {
            index,
            executor,
            scratch: scratch.into(),
            graph,
            external_deps,
            broken,
            artifacts: Mutex::new(HashMap::new()),
        })
    }

    /// The dependency graph the builder operates on.
    #[must_use]
    pub fn graph(&self) -> &PackageGraph {
        &self.graph
    }

    /// Packages whose manifests could not be used, with the reason.
    #[must_use]
    pub fn broken_packages(&self) -> &BTreeMap<String, String> {
        &self.broken
    }

    /// Build the full artifact for one package, running the `DepsOnly`
    /// stage first.
    ///
    /// Both stages consume the same filtered tree over the package and its
    /// closure. Artifacts already produced in this run are reused by
    /// identity without calling the executor again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidManifest`] when the package or a closure
    /// member has an unusable manifest, graph errors for unknown packages
    /// and cycles, and [`Error::Build`] when the executor fails.
    pub fn build(&self, package: &str) -> Result<Artifact> {
        let closure = self.graph.resolve_closure(package)?;
        let mut targets: BTreeSet<String> = closure;
        targets.insert(package.to_string());

        for name in &targets {
            if let Some(message) = self.broken.get(name) {
                return Err(Error::InvalidManifest {
                    package: name.clone(),
                    message: message.clone(),
                });
            }
        }

        // The relevant dependency set: external declarations across the
        // whole closure. Source edits that leave declarations unchanged do
        // not move this key.
        let external: BTreeSet<String> = targets
            .iter()
            .flat_map(|name| {
                self.external_deps
                    .get(name)
                    .map_or(&[][..], Vec::as_slice)
                    .iter()
                    .cloned()
            })
            .collect();

        let tree = self.derive_tree(package, &targets)?;
        let deps_id = ArtifactId::for_dependency_set(&external);

        let deps_artifact = match self.cached(&deps_id) {
            Some(artifact) => {
                debug!(package = %package, id = %deps_id, "dependency artifact reused");
                artifact
            }
            None => {
                let spec = StageSpec {
                    package: package.to_string(),
                    stage: Stage::DepsOnly,
                    id: deps_id.clone(),
                    deps_artifact: None,
                };
                let artifact = self.run_stage(&tree, spec)?;
                self.store(artifact.clone());
                artifact
            }
        };

        let full_id = ArtifactId::for_package(package, tree.hash(), &deps_artifact.id);
        if let Some(artifact) = self.cached(&full_id) {
            debug!(package = %package, id = %full_id, "full artifact reused");
            return Ok(artifact);
        }
        let spec = StageSpec {
            package: package.to_string(),
            stage: Stage::Full,
            id: full_id,
            deps_artifact: Some(deps_artifact.id),
        };
        let artifact = self.run_stage(&tree, spec)?;
        self.store(artifact.clone());
        info!(package = %package, id = %artifact.id, "package built");
        Ok(artifact)
    }

    /// Build every package in the workspace.
    ///
    /// Packages are built in topological levels, leaves first; packages
    /// within one level build in parallel. A failure is reported once at the
    /// failing package, and every package whose closure includes it is
    /// marked blocked rather than re-attempted.
    ///
    /// # Errors
    ///
    /// Returns [`coppice_graph::Error::CyclicDependency`] (wrapped) when the
    /// workspace graph is cyclic. Individual build failures do not fail the
    /// run; they are recorded in the report.
    pub fn build_all(&self) -> Result<BuildReport> {
        let levels = self.graph.topological_levels()?;
        let mut outcomes: BTreeMap<String, BuildOutcome> = BTreeMap::new();

        for level in levels {
            let level_outcomes: Vec<(String, BuildOutcome)> = level
                .par_iter()
                .map(|name| (name.clone(), self.outcome_for(name, &outcomes)))
                .collect();
            outcomes.extend(level_outcomes);
        }

        let report = BuildReport { outcomes };
        info!(
            packages = report.outcomes.len(),
            failed = report.failed().count(),
            blocked = report.blocked().count(),
            "workspace build finished"
        );
        Ok(report)
    }

    /// Decide and, when possible, execute the build of one package given
    /// the outcomes of all earlier levels.
    fn outcome_for(&self, package: &str, prior: &BTreeMap<String, BuildOutcome>) -> BuildOutcome {
        if let Some(message) = self.broken.get(package) {
            return BuildOutcome::Failed {
                message: message.clone(),
            };
        }

        let mut deps: Vec<&String> = self.graph.dependencies_of(package).iter().collect();
        deps.sort();
        for dep in deps {
            match prior.get(dep.as_str()) {
                Some(BuildOutcome::Failed { .. }) => {
                    return BuildOutcome::Blocked {
                        failed_dependency: dep.clone(),
                    };
                }
                Some(BuildOutcome::Blocked { failed_dependency }) => {
                    return BuildOutcome::Blocked {
                        failed_dependency: failed_dependency.clone(),
                    };
                }
                _ => {}
            }
        }

        match self.build(package) {
            Ok(artifact) => BuildOutcome::Built(artifact),
            Err(err) => BuildOutcome::Failed {
                message: err.to_string(),
            },
        }
    }

    /// Derive the filtered tree for one build under the scratch directory.
    ///
    /// The destination is per package; the filter clears any earlier
    /// derivation before copying.
    fn derive_tree(
        &self,
        package: &str,
        targets: &BTreeSet<String>,
    ) -> Result<coppice_filter::FilteredTree> {
        let dest = self.scratch.join(package);
        let tree = SourceFilter::new(self.index).filter_tree(targets, &dest)?;
        Ok(tree)
    }

    fn run_stage(&self, tree: &coppice_filter::FilteredTree, spec: StageSpec) -> Result<Artifact> {
        debug!(package = %spec.package, stage = %spec.stage, id = %spec.id, "requesting build");
        self.executor
            .build_artifact(tree, &spec)
            .map_err(|err| Error::Build {
                package: spec.package.clone(),
                stage: spec.stage,
                message: err.to_string(),
            })
    }

    fn cached(&self, id: &ArtifactId) -> Option<Artifact> {
        // A poisoned cache behaves as cold; builds stay correct, just
        // slower.
        self.artifacts
            .lock()
            .ok()
            .and_then(|cache| cache.get(id).cloned())
    }

    fn store(&self, artifact: Artifact) {
        if let Ok(mut cache) = self.artifacts.lock() {
            cache.insert(artifact.id.clone(), artifact);
        }
    }
}
