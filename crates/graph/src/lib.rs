//! Package dependency graph and closure resolution for coppice.
//!
//! Builds a directed graph over workspace packages from their manifest
//! declarations and answers the one question everything downstream needs:
//! which packages does this package transitively depend on? The graph is a
//! pure function of the manifests, recomputed on every run.
//!
//! # Core Types
//!
//! - [`PackageGraph`] - The sealed dependency graph, with closure resolution
//!   and parallel-level computation
//! - [`Error`] - Unknown packages and dependency cycles (reported with the
//!   complete cycle path)

mod error;
mod graph;

pub use error::{Error, Result};
pub use graph::PackageGraph;
