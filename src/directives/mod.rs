//! Region and loop markers.
//!
//! A RegionMarker wraps a block of sibling statements that is to be offloaded
//! as a unit. A LoopMarker sits directly above a single loop and only counts as
//! active inside a region:
//!
//! ```text
//! Unmarked --apply_region_marker--> InRegion --apply_loop_marker--> HasLoopMarker
//! ```

pub mod options;

pub use options::{LoopMarkerOptions, OptionValue, RegionOptions};

use crate::analysis::{is_parallelisable, DependencyOracle};
use crate::family::{self, Query};
use crate::ir::{NodeId, NodeKind, NodeTree};
use crate::utils::errors::{value_error, AccResult, TreeError, TreeErrorKind, ValueErrorKind};
use log::debug;

/// Check whether `node` is inside a region marker, or is one.
pub fn has_region_marker<T: NodeTree + ?Sized>(tree: &T, node: NodeId) -> AccResult<bool> {
    family::has_ancestor(tree, node, NodeKind::RegionMarker, true)
}

/// Wrap the consecutive sibling statements `block` in a new RegionMarker.
///
/// Region markers never nest: a block already inside a region, or holding
/// one, is rejected.
pub fn apply_region_marker<T: NodeTree + ?Sized>(
    tree: &mut T,
    block: &[NodeId],
    options: &RegionOptions,
) -> AccResult<NodeId> {
    check_region_block(tree, block)?;
    let marker = tree.wrap_in_region(block, options)?;
    debug!("applied region marker {} over {} node(s) [{}]", marker, block.len(), options);
    Ok(marker)
}

/// Every rule [`apply_region_marker`] enforces, without touching the tree.
pub(crate) fn check_region_block<T: NodeTree + ?Sized>(tree: &T, block: &[NodeId]) -> AccResult<()> {
    if block.is_empty() {
        return value_error(ValueErrorKind::EmptyBlock, "Cannot apply a region marker to an empty block.");
    }
    for node in block {
        let kind = family::check_node(tree, *node)?;
        let in_statement_list = tree
            .parent_of(*node)
            .is_some_and(|p| tree.node_kind(p) == Some(NodeKind::Schedule));
        if kind == NodeKind::Schedule || !in_statement_list {
            return Err(TreeError::new(
                TreeErrorKind::NotStatement,
                format!("Cannot apply a region marker to {} '{}': it is not a statement.", kind, node),
            )
            .with_node(*node)
            .into());
        }
        let nested = has_region_marker(tree, *node)?
            || family::has_descendant(tree, *node, NodeKind::RegionMarker, false)?;
        if nested {
            return value_error(
                ValueErrorKind::AlreadyMarked,
                format!("Cannot apply a region marker to {}: region markers may not be nested.", node),
            );
        }
    }
    if !family::are_siblings(tree, block)? {
        return value_error(ValueErrorKind::NotSiblings, "Region marker blocks must share a parent.");
    }
    let mut positions: Vec<usize> = block.iter().map(|n| tree.position(*n)).collect();
    positions.sort_unstable();
    if positions.windows(2).any(|w| w[1] != w[0] + 1) {
        return value_error(ValueErrorKind::NotContiguous, "Region marker blocks must be consecutive.");
    }
    Ok(())
}

/// Check whether `loop_node` sits directly below a LoopMarker inside a region.
pub fn has_loop_marker<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<bool> {
    family::expect_kind(tree, loop_node, NodeKind::Loop)?;
    Ok(loop_marker_of(tree, loop_node)?.is_some() && has_region_marker(tree, loop_node)?)
}

/// The LoopMarker directly above `loop_node`, active or not.
pub(crate) fn loop_marker_of<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<Option<NodeId>> {
    Ok(family::parent(tree, loop_node)?.filter(|p| tree.node_kind(*p) == Some(NodeKind::LoopMarker)))
}

/// Wrap `loop_node` in a new LoopMarker with the requested clauses pre-set.
///
/// No dependency check is made; see [`apply_loop_marker_checked`].
pub fn apply_loop_marker<T: NodeTree + ?Sized>(
    tree: &mut T,
    loop_node: NodeId,
    options: &LoopMarkerOptions,
) -> AccResult<NodeId> {
    check_loop_marker(tree, loop_node, options)?;
    let marker = tree.wrap_in_loop_marker(loop_node)?;
    let clauses = tree.clauses_mut(marker).ok_or_else(|| {
        TreeError::new(TreeErrorKind::UnknownNode, "New loop marker carries no clause record.").with_node(marker)
    })?;
    if options.sequential {
        clauses.set_sequential()?;
    }
    if options.gang {
        clauses.set_gang()?;
    }
    if options.vector {
        clauses.set_vector()?;
    }
    debug!("applied loop marker {} to loop {} [{}]", marker, loop_node, clauses);
    Ok(marker)
}

fn check_loop_marker<T: NodeTree + ?Sized>(
    tree: &T,
    loop_node: NodeId,
    options: &LoopMarkerOptions,
) -> AccResult<()> {
    family::expect_kind(tree, loop_node, NodeKind::Loop)?;
    options.validate()?;
    if !has_region_marker(tree, loop_node)? {
        return value_error(
            ValueErrorKind::MissingRegionMarker,
            "Cannot apply a loop marker without a region marker.",
        );
    }
    if loop_marker_of(tree, loop_node)?.is_some() {
        return value_error(
            ValueErrorKind::AlreadyMarked,
            format!("Loop {} already has a loop marker.", loop_node),
        );
    }
    Ok(())
}

/// [`apply_loop_marker`], refusing loops `oracle` cannot parallelise.
///
/// The oracle is not consulted for `force` or `sequential` requests.
pub fn apply_loop_marker_checked<T, O>(
    tree: &mut T,
    loop_node: NodeId,
    options: &LoopMarkerOptions,
    oracle: &O,
) -> AccResult<NodeId>
where
    T: NodeTree + ?Sized,
    O: DependencyOracle<T> + ?Sized,
{
    check_loop_marker(tree, loop_node, options)?;
    if !options.force && !options.sequential && !is_parallelisable(tree, loop_node, oracle)? {
        let variable = tree.variable(loop_node).unwrap_or_default();
        return value_error(
            ValueErrorKind::ParallelismRejected,
            format!("Loop '{}' cannot be safely parallelised; use force to mark it anyway.", variable),
        );
    }
    apply_loop_marker(tree, loop_node, options)
}

/// Region markers in the sub-tree of `node`, outer-most first.
pub fn region_markers<T: NodeTree + ?Sized>(tree: &T, node: NodeId) -> AccResult<Vec<NodeId>> {
    family::descendants(tree, node, &Query::of(NodeKind::RegionMarker).inclusive())
}
