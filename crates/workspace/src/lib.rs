//! Workspace member discovery and manifest dependency classification for coppice.
//!
//! This crate is the single source of truth about what the workspace *declares*:
//! which packages exist, where they live, and which dependencies each of them
//! names in its manifest. Everything downstream (closure resolution, source
//! filtering, artifact building) is derived from the data produced here and is
//! recomputed from the manifests on every resolution run.
//!
//! # Core Types
//!
//! - [`WorkspaceIndex`] - Enumerates member packages from explicit paths and
//!   `<dir>/*` patterns and maps package name to package root
//! - [`Package`] - A single member package (name + root path)
//! - [`ManifestReader`] - Parses a package manifest and classifies each
//!   declared dependency as local (path marker) or external
//! - [`DependencyDecl`] / [`DependencySpec`] - One declared dependency and how
//!   it was specified
//!
//! # Local vs. external
//!
//! A dependency declaration is *local* only when its own specification carries
//! a path marker (a `path` key, or `workspace = true` resolving to a path
//! entry in the root `[workspace.dependencies]` table). A registry spec whose
//! name happens to match a workspace package is external, deliberately: the
//! worst a false-external can cause is an unnecessary rebuild, while a
//! false-local would omit a real registry dependency.
//!
//! # Example
//!
//! ```rust,ignore
//! use coppice_workspace::{ManifestReader, WorkspaceIndex};
//!
//! let reader = ManifestReader::new("/path/to/workspace")?;
//! let index = WorkspaceIndex::discover("/path/to/workspace", reader.members())?;
//!
//! for package in index.packages() {
//!     let deps = reader.read_dependencies(package)?;
//!     let locals = deps.iter().filter(|d| d.is_local()).count();
//!     println!("{}: {} declared, {} local", package.name, deps.len(), locals);
//! }
//! ```

mod error;
mod index;
mod manifest;
mod types;

pub use error::{Error, Result};
pub use index::WorkspaceIndex;
pub use manifest::ManifestReader;
pub use types::{DependencyDecl, DependencySpec, MANIFEST_FILE, Package};
