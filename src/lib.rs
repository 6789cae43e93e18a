//! # accnest - Loop-nest analysis and directive annotation
//!
//! A decision and mutation layer over a compiler's loop-nest AST:
//! - Family queries (ancestors, descendants, logical children, sibling runs)
//! - Loop-nest shape predicates (outer loops, nest depth, perfect and simple nests)
//! - Region and loop markers, and the `seq`/`gang`/`vector`/`collapse` clause protocol
//!
//! ## Architecture
//!
//! ```text
//! NodeTree → family → analysis → directives → clauses → recipes
//!                              ↘ split ↗
//! ```
//!
//! The tree is owned by the caller and reached through the [`ir::NodeTree`]
//! trait. [`ir::Tree`] is an arena implementation built from a
//! [`ir::ast`] description.
//!
//! ## Example
//!
//! ```rust
//! use accnest::prelude::*;
//!
//! let body = vec![Stmt::assign("a", &["i", "j"], Expr::real("0.0"))];
//! let mut tree = Tree::from_stmts(&Stmt::loop_nest(&["j", "i"], 10, body));
//! let loops = tree.loops();
//!
//! apply_region_marker(&mut tree, &[loops[0]], &RegionOptions::new())?;
//! apply_loop_gang(&mut tree, loops[0])?;
//! apply_loop_vector(&mut tree, loops[0])?;
//! apply_loop_seq(&mut tree, loops[1])?;
//!
//! assert!(has_gang_clause(&tree, loops[0])?);
//! assert!(has_seq_clause(&tree, loops[1])?);
//! # Ok::<(), accnest::utils::errors::AccError>(())
//! ```

#![warn(clippy::all)]

pub mod analysis;
pub mod clauses;
pub mod directives;
pub mod family;
pub mod ir;
pub mod recipes;
pub mod split;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and functions.

    pub use crate::analysis::{
        is_outer_loop, is_parallelisable, is_perfectly_nested, is_perfectly_nested_with, is_simple_loop,
        is_simple_loop_with, loop_nest_variable_names, loop_variable_name, nest_depth_count,
        perfect_nest_depth, DependencyOracle, NestPolicy, SubscriptOracle,
    };
    pub use crate::clauses::{
        apply_default_collapse, apply_loop_collapse, apply_loop_gang, apply_loop_seq, apply_loop_vector,
        ensure_loop_marker, has_collapse_clause, has_gang_clause, has_seq_clause, has_vector_clause,
        loop_clauses, LoopClauses,
    };
    pub use crate::directives::{
        apply_loop_marker, apply_loop_marker_checked, apply_region_marker, has_loop_marker, has_region_marker,
        LoopMarkerOptions, OptionValue, RegionOptions,
    };
    pub use crate::family::{
        ancestors, are_siblings, children, descendants, has_ancestor, has_descendant, is_next_sibling, parent,
        siblings, Query,
    };
    pub use crate::ir::ast::{AssignTarget, BinaryOp, Block, Expr, Stmt};
    pub use crate::ir::{KindSet, NodeId, NodeKind, NodeTree, Tree};
    pub use crate::recipes::{annotate, AnnotationReport};
    pub use crate::split::{apply_region_markers_to_runs, split_consecutive, split_consecutive_strict};
    pub use crate::utils::errors::*;
    pub use crate::utils::pretty::dump_tree;
    pub use crate::AnnotationConfig;
}

use analysis::NestPolicy;
use directives::RegionOptions;
use serde::{Deserialize, Serialize};

/// Configuration for [`recipes::annotate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Options passed to every region marker created
    pub region_options: RegionOptions,
    /// Wrap each outer-most loop in a region marker
    pub mark_regions: bool,
    /// Give every loop inside a region a loop marker
    pub mark_all_loops: bool,
    /// Apply `gang` and `vector` to outer-most loops
    pub gang_vector_outer: bool,
    /// Apply `seq` to loops nested inside another loop
    pub seq_inner: bool,
    /// Collapse the perfectly nested levels of each outer-most loop
    pub collapse_perfect_nests: bool,
    /// Nest classification used for collapsing
    pub nest_policy: NestPolicy,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            region_options: RegionOptions::new(),
            mark_regions: true,
            mark_all_loops: true,
            gang_vector_outer: true,
            seq_inner: true,
            collapse_perfect_nests: false,
            nest_policy: NestPolicy::default(),
        }
    }
}

impl AnnotationConfig {
    /// Only wrap outer loops in regions; leave loop scheduling to the compiler.
    pub fn regions_only() -> Self {
        Self {
            mark_all_loops: false,
            gang_vector_outer: false,
            seq_inner: false,
            ..Default::default()
        }
    }

    /// Regions plus collapsed perfect nests.
    pub fn collapsed() -> Self {
        Self {
            collapse_perfect_nests: true,
            ..Default::default()
        }
    }

    pub fn with_region_options(mut self, options: RegionOptions) -> Self {
        self.region_options = options;
        self
    }

    pub fn with_loop_markers(mut self, enabled: bool) -> Self {
        self.mark_all_loops = enabled;
        self
    }

    pub fn with_clauses(mut self, gang_vector_outer: bool, seq_inner: bool) -> Self {
        self.gang_vector_outer = gang_vector_outer;
        self.seq_inner = seq_inner;
        self
    }

    pub fn with_collapse(mut self, enabled: bool) -> Self {
        self.collapse_perfect_nests = enabled;
        self
    }

    pub fn with_nest_policy(mut self, policy: NestPolicy) -> Self {
        self.nest_policy = policy;
        self
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_config_presets() {
        let config = AnnotationConfig::regions_only();
        assert!(config.mark_regions);
        assert!(!config.mark_all_loops && !config.gang_vector_outer && !config.seq_inner);
        assert!(AnnotationConfig::collapsed().collapse_perfect_nests);
        let config = AnnotationConfig::default().with_clauses(false, true);
        assert!(!config.gang_vector_outer && config.seq_inner);
    }
}
