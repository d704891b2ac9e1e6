//! The query AST: operations composed of selections, filters and fields.
//!
//! Factories in [`crate::translation::query`] build an [`operations::Operation`] which
//! owns its whole subtree. Emission walks the tree with a [`TraversalContext`] and a
//! [`State`], asking every node to `apply` itself and collecting Cypher clauses in
//! traversal order.
//!
//! [`TraversalContext`]: crate::translation::context::TraversalContext
//! [`State`]: crate::translation::helpers::State

pub mod fields;
pub mod filters;
pub mod operations;
pub mod selection;
pub mod sort;
mod tree;

pub use tree::{print_tree, QueryAstNode};
