//! Package graph construction and closure resolution using petgraph.
//!
//! The graph is rebuilt from manifests on every resolution run; there is no
//! persisted copy that could drift from what the manifests declare.

use crate::error::{Error, Result};
use coppice_workspace::{ManifestReader, WorkspaceIndex};
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// One step of the iterative closure traversal.
enum Step {
    /// Push a not-yet-seen dependency onto the path.
    Descend(String),
    /// A fully explored dependency was reached again (diamond shape).
    Revisit(String),
    /// A dependency already on the active path closes a cycle.
    Cycle(String),
    /// The top-of-stack package has no dependencies left.
    Finish,
}

/// Directed dependency graph over workspace packages.
///
/// An edge runs from a dependency to its dependent, so topological order
/// yields leaves first. Construction is two-phase: every package is added
/// with its declared local dependency names, then [`add_dependency_edges`]
/// seals the graph, dropping dependency names that match no known package
/// (absence from the index is the defining test for an external dependency).
///
/// [`add_dependency_edges`]: PackageGraph::add_dependency_edges
pub struct PackageGraph {
    graph: DiGraph<String, ()>,
    name_to_node: HashMap<String, NodeIndex>,
    /// Local dependency names per package. Pruned to known packages when the
    /// graph is sealed.
    dependencies: HashMap<String, Vec<String>>,
    /// Packages whose manifests could not be parsed, with the reason. They
    /// take part in the graph with no edges so siblings resolve normally.
    broken: BTreeMap<String, String>,
}

impl PackageGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_node: HashMap::new(),
            dependencies: HashMap::new(),
            broken: BTreeMap::new(),
        }
    }

    /// Build the graph for an entire workspace.
    ///
    /// Reads every member's manifest, keeps the declarations that carry a
    /// local-path marker, and seals the graph. A manifest that fails to
    /// parse poisons only its own package: it is marked broken and joins the
    /// graph with no edges, so sibling packages resolve normally and the
    /// failure surfaces when a closure touches the broken member.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors (missing manifests, I/O failures)
    /// from the workspace layer.
    pub fn from_workspace(index: &WorkspaceIndex, reader: &ManifestReader) -> Result<Self> {
        let mut graph = Self::new();
        for package in index.packages() {
            match reader.read_dependencies(package) {
                Ok(declarations) => {
                    let local_deps: Vec<String> = declarations
                        .into_iter()
                        .filter(|decl| decl.is_local())
                        .map(|decl| decl.name)
                        .collect();
                    graph.add_package(&package.name, local_deps);
                }
                Err(err) if err.is_manifest_error() => {
                    warn!(package = %package.name, error = %err, "manifest unusable, package excluded from resolution");
                    graph.mark_broken(&package.name, err.to_string());
                }
                Err(err) => return Err(err.into()),
            }
        }
        graph.add_dependency_edges();
        Ok(graph)
    }

    /// Add a package with its declared local dependency names.
    ///
    /// Adding a name twice keeps the first declaration set.
    pub fn add_package(&mut self, name: &str, local_deps: Vec<String>) {
        if self.name_to_node.contains_key(name) {
            return;
        }
        let node = self.graph.add_node(name.to_string());
        self.name_to_node.insert(name.to_string(), node);
        self.dependencies.insert(name.to_string(), local_deps);
        debug!(package = %name, "added package node");
    }

    /// Add a package whose manifest could not be parsed.
    ///
    /// The package gets a node with no dependencies; resolving a closure
    /// that touches it fails with [`Error::UnusableManifest`].
    pub fn mark_broken(&mut self, name: &str, message: String) {
        self.add_package(name, Vec::new());
        self.broken.insert(name.to_string(), message);
    }

    /// Packages whose manifests could not be parsed, with the reason.
    #[must_use]
    pub fn broken_packages(&self) -> &BTreeMap<String, String> {
        &self.broken
    }

    /// Seal the graph: add dependency edges and drop unknown dependencies.
    ///
    /// A local-path declaration whose name matches no workspace package is
    /// treated as external and removed, with a debug trace. Must run after
    /// all packages have been added and before closures are resolved.
    pub fn add_dependency_edges(&mut self) {
        let mut edges = Vec::new();
        for (name, deps) in &mut self.dependencies {
            let Some(&to) = self.name_to_node.get(name) else {
                continue;
            };
            deps.retain(|dep| {
                if let Some(&from) = self.name_to_node.get(dep) {
                    edges.push((from, to));
                    true
                } else {
                    debug!(package = %name, dependency = %dep, "dropping dependency on non-member");
                    false
                }
            });
        }
        for (from, to) in edges {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Whether a package with this name is in the graph.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_node.contains_key(name)
    }

    /// Number of packages in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph holds no packages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// The direct local dependencies of a package, in declaration order.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.dependencies.get(name).map_or(&[], Vec::as_slice)
    }

    /// Whether the sealed graph contains a dependency cycle.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Compute the transitive closure of local dependencies for one package.
    ///
    /// The closure excludes the package itself. Traversal is an iterative
    /// depth-first walk with an explicit path stack, memoizing fully explored
    /// packages within the call so diamond shapes are visited once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPackage`] when the name is not in the graph,
    /// [`Error::CyclicDependency`] (naming every package on the cycle) when
    /// a cycle is reachable from the package, and
    /// [`Error::UnusableManifest`] when the package or a closure member is
    /// marked broken. Broken packages outside the closure have no effect.
    pub fn resolve_closure(&self, package: &str) -> Result<BTreeSet<String>> {
        if !self.name_to_node.contains_key(package) {
            return Err(Error::UnknownPackage {
                package: package.to_string(),
            });
        }
        if let Some(message) = self.broken.get(package) {
            return Err(Error::UnusableManifest {
                package: package.to_string(),
                message: message.clone(),
            });
        }

        let mut closure: BTreeSet<String> = BTreeSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut on_path: HashSet<String> = HashSet::new();
        let mut stack: Vec<(String, usize)> = vec![(package.to_string(), 0)];
        on_path.insert(package.to_string());

        while !stack.is_empty() {
            let step = match stack.last_mut() {
                Some((name, next_dep)) => {
                    let deps = self.dependencies.get(name.as_str()).map_or(&[][..], Vec::as_slice);
                    if *next_dep < deps.len() {
                        let dep = deps[*next_dep].clone();
                        *next_dep += 1;
                        if on_path.contains(&dep) {
                            Step::Cycle(dep)
                        } else if visited.contains(&dep) {
                            Step::Revisit(dep)
                        } else {
                            Step::Descend(dep)
                        }
                    } else {
                        Step::Finish
                    }
                }
                None => break,
            };

            match step {
                Step::Descend(dep) => {
                    closure.insert(dep.clone());
                    on_path.insert(dep.clone());
                    stack.push((dep, 0));
                }
                Step::Revisit(dep) => {
                    closure.insert(dep);
                }
                Step::Cycle(dep) => {
                    let start = stack
                        .iter()
                        .position(|(name, _)| *name == dep)
                        .unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|(name, _)| name.clone()).collect();
                    cycle.push(dep);
                    return Err(Error::CyclicDependency { cycle });
                }
                Step::Finish => {
                    if let Some((name, _)) = stack.pop() {
                        on_path.remove(&name);
                        visited.insert(name);
                    }
                }
            }
        }

        // A broken member's own dependencies are unknown, so a closure that
        // touches one cannot be trusted.
        for name in &closure {
            if let Some(message) = self.broken.get(name) {
                return Err(Error::UnusableManifest {
                    package: name.clone(),
                    message: message.clone(),
                });
            }
        }

        debug!(package = %package, closure_size = closure.len(), "resolved closure");
        Ok(closure)
    }

    /// Group packages into parallel build levels, leaves first.
    ///
    /// Every package in level `n` depends only on packages in levels below
    /// `n`, so packages within one level may build concurrently. Levels are
    /// sorted by name for determinism.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CyclicDependency`] when the graph is cyclic.
    pub fn topological_levels(&self) -> Result<Vec<Vec<String>>> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            let name = self.graph[cycle.node_id()].clone();
            // The node is on a cycle, so resolving its closure reports the
            // full cycle path.
            match self.resolve_closure(&name) {
                Err(err) => err,
                Ok(_) => Error::CyclicDependency {
                    cycle: vec![name.clone(), name],
                },
            }
        })?;

        let mut level_of: HashMap<String, usize> = HashMap::new();
        let mut levels: Vec<Vec<String>> = Vec::new();
        for node in sorted {
            let name = self.graph[node].clone();
            let level = self
                .dependencies_of(&name)
                .iter()
                .filter_map(|dep| level_of.get(dep))
                .map(|&dep_level| dep_level + 1)
                .max()
                .unwrap_or(0);
            if level >= levels.len() {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(name.clone());
            level_of.insert(name, level);
        }
        for level in &mut levels {
            level.sort();
        }
        Ok(levels)
    }

    /// Iterate over all package names in the graph.
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(String::as_str)
    }
}

impl Default for PackageGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_of(packages: &[(&str, &[&str])]) -> PackageGraph {
        let mut graph = PackageGraph::new();
        for (name, deps) in packages {
            graph.add_package(name, deps.iter().map(|s| (*s).to_string()).collect());
        }
        graph.add_dependency_edges();
        graph
    }

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_closure_of_leaf_is_empty() {
        let graph = graph_of(&[("a", &[])]);

        let closure = graph.resolve_closure("a").unwrap();

        assert!(closure.is_empty());
    }

    #[test]
    fn test_closure_chain() {
        let graph = graph_of(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);

        let closure = graph.resolve_closure("c").unwrap();

        assert_eq!(names(&closure), vec!["a", "b"]);
    }

    #[test]
    fn test_closure_diamond_visits_shared_dep_once() {
        let graph = graph_of(&[
            ("d", &[]),
            ("b", &["d"]),
            ("c", &["d"]),
            ("a", &["b", "c"]),
        ]);

        let closure = graph.resolve_closure("a").unwrap();

        assert_eq!(names(&closure), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_closure_ignores_disjoint_packages() {
        let graph = graph_of(&[("a", &[]), ("b", &["a"]), ("d", &[])]);

        let closure = graph.resolve_closure("b").unwrap();

        assert_eq!(names(&closure), vec!["a"]);
        assert!(graph.resolve_closure("d").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_dependency_is_dropped() {
        // A path declaration naming no workspace member is external.
        let graph = graph_of(&[("a", &["vendored-lib"])]);

        let closure = graph.resolve_closure("a").unwrap();

        assert!(closure.is_empty());
        assert!(graph.dependencies_of("a").is_empty());
    }

    #[test]
    fn test_unknown_package_is_an_error() {
        let graph = graph_of(&[("a", &[])]);

        let result = graph.resolve_closure("missing");

        assert!(matches!(
            result,
            Err(Error::UnknownPackage { package }) if package == "missing"
        ));
    }

    #[test]
    fn test_cycle_reports_full_path() {
        let graph = graph_of(&[("x", &["a"]), ("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);

        let result = graph.resolve_closure("x");

        match result {
            Err(Error::CyclicDependency { cycle }) => {
                assert_eq!(cycle, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_self_cycle() {
        let graph = graph_of(&[("a", &["a"])]);

        let result = graph.resolve_closure("a");

        match result {
            Err(Error::CyclicDependency { cycle }) => {
                assert_eq!(cycle, vec!["a", "a"]);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_unreachable_from_package_does_not_block_it() {
        let graph = graph_of(&[("a", &[]), ("b", &["a"]), ("x", &["y"]), ("y", &["x"])]);

        let closure = graph.resolve_closure("b").unwrap();

        assert_eq!(names(&closure), vec!["a"]);
        assert!(graph.has_cycles());
        assert!(graph.resolve_closure("x").is_err());
    }

    #[test]
    fn test_topological_levels_leaves_first() {
        let graph = graph_of(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &[]),
            ("e", &["b", "c"]),
        ]);

        let levels = graph.topological_levels().unwrap();

        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0], vec!["a", "d"]);
        assert_eq!(levels[1], vec!["b", "c"]);
        assert_eq!(levels[2], vec!["e"]);
    }

    #[test]
    fn test_topological_levels_on_cyclic_graph() {
        let graph = graph_of(&[("a", &["b"]), ("b", &["a"])]);

        let result = graph.topological_levels();

        assert!(matches!(result, Err(Error::CyclicDependency { .. })));
    }

    #[test]
    fn test_empty_graph() {
        let graph = PackageGraph::new();

        assert!(graph.is_empty());
        assert!(!graph.has_cycles());
        assert!(graph.topological_levels().unwrap().is_empty());
    }

    #[test]
    fn test_from_workspace() {
        use std::fs;
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(
            root.join("Cargo.toml"),
            "[workspace]\nmembers = [\"crates/*\"]\n",
        )
        .unwrap();
        for (name, manifest) in [
            ("pkg-a", "[package]\nname = \"pkg-a\"\n"),
            (
                "pkg-b",
                "[dependencies]\npkg-a = { path = \"../pkg-a\" }\nserde = \"1.0\"\n",
            ),
        ] {
            let dir = root.join("crates").join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("Cargo.toml"), manifest).unwrap();
        }

        let reader = ManifestReader::new(root).unwrap();
        let index = WorkspaceIndex::discover(root, reader.members()).unwrap();
        let graph = PackageGraph::from_workspace(&index, &reader).unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.dependencies_of("pkg-b"), &["pkg-a".to_string()]);
        let closure = graph.resolve_closure("pkg-b").unwrap();
        assert_eq!(names(&closure), vec!["pkg-a"]);
    }

    #[test]
    fn test_broken_package_blocks_only_closures_touching_it() {
        let mut graph = PackageGraph::new();
        graph.add_package("a", Vec::new());
        graph.add_package("b", vec!["a".to_string()]);
        graph.add_package("c", vec!["d".to_string()]);
        graph.mark_broken("d", "parse failure".to_string());
        graph.add_dependency_edges();

        assert_eq!(names(&graph.resolve_closure("b").unwrap()), vec!["a"]);
        assert!(matches!(
            graph.resolve_closure("d"),
            Err(Error::UnusableManifest { package, .. }) if package == "d"
        ));
        assert!(matches!(
            graph.resolve_closure("c"),
            Err(Error::UnusableManifest { package, .. }) if package == "d"
        ));
    }

    #[test]
    fn test_from_workspace_tolerates_broken_sibling_manifest() {
        use std::fs;
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(
            root.join("Cargo.toml"),
            "[workspace]\nmembers = [\"crates/*\"]\n",
        )
        .unwrap();
        for (name, manifest) in [
            ("pkg-a", "[package]\nname = \"pkg-a\"\n"),
            ("pkg-b", "[dependencies]\npkg-a = { path = \"../pkg-a\" }\n"),
            ("pkg-d", "[dependencies\nbroken"),
        ] {
            let dir = root.join("crates").join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("Cargo.toml"), manifest).unwrap();
        }

        let reader = ManifestReader::new(root).unwrap();
        let index = WorkspaceIndex::discover(root, reader.members()).unwrap();
        let graph = PackageGraph::from_workspace(&index, &reader).unwrap();

        // pkg-d's malformed manifest must not poison unrelated closures
        assert_eq!(names(&graph.resolve_closure("pkg-b").unwrap()), vec!["pkg-a"]);
        assert!(graph.broken_packages().contains_key("pkg-d"));
        assert!(matches!(
            graph.resolve_closure("pkg-d"),
            Err(Error::UnusableManifest { package, .. }) if package == "pkg-d"
        ));
    }
}
