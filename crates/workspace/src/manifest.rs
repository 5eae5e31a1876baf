//! Manifest parsing and dependency classification.

use crate::error::{Error, Result};
use crate::types::{DependencyDecl, DependencySpec, MANIFEST_FILE, Package};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Dependency tables of a manifest, in the order they contribute declarations.
const DEPENDENCY_TABLES: [&str; 3] = ["dependencies", "dev-dependencies", "build-dependencies"];

#[derive(Deserialize)]
struct RawManifest {
    workspace: Option<RawWorkspace>,
    dependencies: Option<BTreeMap<String, toml::Value>>,
    #[serde(rename = "dev-dependencies")]
    dev_dependencies: Option<BTreeMap<String, toml::Value>>,
    #[serde(rename = "build-dependencies")]
    build_dependencies: Option<BTreeMap<String, toml::Value>>,
}

impl RawManifest {
    fn table(&self, name: &str) -> Option<&BTreeMap<String, toml::Value>> {
        match name {
            "dependencies" => self.dependencies.as_ref(),
            "dev-dependencies" => self.dev_dependencies.as_ref(),
            "build-dependencies" => self.build_dependencies.as_ref(),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct RawWorkspace {
    members: Option<Vec<String>>,
    dependencies: Option<BTreeMap<String, toml::Value>>,
}

/// Reads package manifests and classifies declared dependencies.
///
/// The reader is constructed from the workspace root so it can resolve
/// `workspace = true` declarations against the root manifest's
/// `[workspace.dependencies]` table: an inherited declaration is local
/// exactly when the root entry carries a path marker.
#[derive(Debug, Clone)]
pub struct ManifestReader {
    workspace_root: PathBuf,
    members: Vec<String>,
    /// Entries of the root `[workspace.dependencies]` table, kept whole so
    /// inherited declarations resolve both their path marker and their
    /// registry spec against the root entry.
    inherited: BTreeMap<String, toml::Value>,
}

impl ManifestReader {
    /// Load the workspace manifest at `workspace_root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkspaceManifestNotFound`] when the root manifest is
    /// missing and [`Error::WorkspaceManifestParse`] when it is malformed.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self> {
        let workspace_root = workspace_root.as_ref().to_path_buf();
        let manifest_path = workspace_root.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(Error::WorkspaceManifestNotFound {
                path: manifest_path,
            });
        }

        let content = fs::read_to_string(&manifest_path)
            .map_err(|e| Error::io(e, &manifest_path, "reading workspace manifest"))?;
        let manifest: RawManifest =
            toml::from_str(&content).map_err(|source| Error::WorkspaceManifestParse {
                path: manifest_path.clone(),
                source,
            })?;

        let workspace = manifest.workspace.as_ref();
        let members = workspace
            .and_then(|ws| ws.members.clone())
            .unwrap_or_default();

        let inherited = workspace
            .and_then(|ws| ws.dependencies.clone())
            .unwrap_or_default();

        debug!(
            members = members.len(),
            inherited = inherited.len(),
            "workspace manifest loaded"
        );
        Ok(Self {
            workspace_root,
            members,
            inherited,
        })
    }

    /// The member patterns declared by the workspace manifest.
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// The workspace root this reader was constructed from.
    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Read and classify the dependency declarations of one package.
    ///
    /// Declarations come from the `dependencies`, `dev-dependencies`, and
    /// `build-dependencies` tables in that order (sorted by name within each
    /// table); a name appearing in more than one table is reported once.
    ///
    /// # Errors
    ///
    /// A missing manifest is [`Error::ManifestNotFound`]; malformed TOML is
    /// [`Error::ManifestParse`]. Both carry the package name.
    pub fn read_dependencies(&self, package: &Package) -> Result<Vec<DependencyDecl>> {
        let manifest_path = self.workspace_root.join(package.manifest_path());
        if !manifest_path.is_file() {
            return Err(Error::ManifestNotFound {
                package: package.name.clone(),
                path: manifest_path,
            });
        }

        let content = fs::read_to_string(&manifest_path)
            .map_err(|e| Error::io(e, &manifest_path, "reading package manifest"))?;
        let manifest: RawManifest =
            toml::from_str(&content).map_err(|source| Error::ManifestParse {
                package: package.name.clone(),
                path: manifest_path,
                source,
            })?;

        let mut declarations = Vec::new();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for table_name in DEPENDENCY_TABLES {
            let Some(table) = manifest.table(table_name) else {
                continue;
            };
            for (name, value) in table {
                if !seen.insert(name.as_str()) {
                    continue;
                }
                let spec = self.classify(&package.name, name, value)?;
                trace!(package = %package.name, dependency = %name, %spec, "classified dependency");
                declarations.push(DependencyDecl {
                    name: name.clone(),
                    spec,
                });
            }
        }

        Ok(declarations)
    }

    /// The path marker of an inherited declaration's root entry, if any.
    fn inherited_path(&self, name: &str) -> Option<PathBuf> {
        self.inherited
            .get(name)?
            .as_table()?
            .get("path")
            .and_then(toml::Value::as_str)
            .map(PathBuf::from)
    }

    /// Classify one dependency value as a path or registry specification.
    ///
    /// The path marker on the declaration itself is the sole test for
    /// "local": a registry spec is external even when its name matches a
    /// workspace package. Registry specs carry the canonical rendering of
    /// the whole declaration, so any edit to it (version, features, flags)
    /// changes the spec.
    fn classify(
        &self,
        package: &str,
        dependency: &str,
        value: &toml::Value,
    ) -> Result<DependencySpec> {
        match value {
            toml::Value::String(req) => Ok(DependencySpec::Registry(req.clone())),
            toml::Value::Table(table) => {
                if let Some(path) = table.get("path").and_then(toml::Value::as_str) {
                    return Ok(DependencySpec::Path(PathBuf::from(path)));
                }
                let inherits = table
                    .get("workspace")
                    .and_then(toml::Value::as_bool)
                    .unwrap_or(false);
                if inherits {
                    if let Some(path) = self.inherited_path(dependency) {
                        return Ok(DependencySpec::Path(path));
                    }
                    // The effective spec is the root entry plus the local
                    // additions (features etc.), so both take part.
                    let root = self
                        .inherited
                        .get(dependency)
                        .map_or_else(|| "*".to_string(), canonical_spec);
                    return Ok(DependencySpec::Registry(format!(
                        "workspace:{root}:{}",
                        canonical_spec(value)
                    )));
                }
                Ok(DependencySpec::Registry(canonical_spec(value)))
            }
            _ => Err(Error::InvalidDependencySpec {
                package: package.to_string(),
                dependency: dependency.to_string(),
            }),
        }
    }
}

/// Render a dependency value deterministically, with table keys sorted.
///
/// Equal declarations render equally regardless of key order; any change to
/// the declaration's content produces a different rendering.
fn canonical_spec(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => format!("\"{s}\""),
        toml::Value::Integer(n) => n.to_string(),
        toml::Value::Float(n) => n.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        toml::Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_spec).collect();
            format!("[{}]", items.join(","))
        }
        toml::Value::Table(table) => {
            let mut entries: Vec<(&str, &toml::Value)> =
                table.iter().map(|(key, value)| (key.as_str(), value)).collect();
            entries.sort_by_key(|(key, _)| *key);
            let entries: Vec<String> = entries
                .iter()
                .map(|(key, value)| format!("{key}={}", canonical_spec(value)))
                .collect();
            format!("{{{}}}", entries.join(","))
        }
    }
}
