//! Tree model consumed by the analysis and annotation passes.
//!
//! This module defines:
//! - Node handles, kinds and kind filters
//! - The [`NodeTree`] capability trait
//! - An arena-backed [`Tree`] plus a declarative statement description to build it

pub mod arena;
pub mod ast;
pub mod lower;
pub mod node;
pub mod tree;

pub use arena::Tree;
pub use node::{KindSet, NodeId, NodeKind};
pub use tree::NodeTree;
