//! Minimal source-tree derivation and content hashing for coppice.
//!
//! Given a target set of workspace packages, derives a read-only copy of the
//! workspace containing only the files relevant to that set, with the
//! workspace manifest narrowed to match. The copy is content-addressed so
//! identical (target set, source content) pairs hash identically, which is
//! what makes the derived tree usable as a cache key: editing a package
//! outside the target set can never invalidate the tree.
//!
//! # Core Types
//!
//! - [`SourceFilter`] - Derives a [`FilteredTree`] for a target package set
//! - [`FilteredTree`] - Handle to the derived copy: root path, target set,
//!   content hash
//! - [`hash_tree`] - Deterministic content hash over an arbitrary tree

mod error;
mod filter;
mod tree;

pub use error::{Error, Result};
pub use filter::SourceFilter;
pub use tree::{FilteredTree, hash_tree};
