//! Utility modules for the annotation engine.
//!
//! This module contains common utilities used throughout the codebase:
//! - Error types
//! - Symbol interning
//! - Tree outlines

pub mod errors;
pub mod intern;
pub mod pretty;

// Re-exports
pub use errors::*;
pub use intern::{Symbol, SymbolInterner};
pub use pretty::dump_tree;
