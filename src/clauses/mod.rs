//! Loop clauses: `seq`, `gang`, `vector` and `collapse`.
//!
//! Every clause mutator first promotes the loop to carry a loop marker
//! ([`ensure_loop_marker`]), which requires an enclosing region marker.

pub mod state;

pub use state::LoopClauses;

use crate::analysis::perfect_nest_depth;
use crate::directives::{self, has_loop_marker, has_region_marker, LoopMarkerOptions};
use crate::family::{self, Query};
use crate::ir::{NodeId, NodeKind, NodeTree};
use crate::utils::errors::{value_error, AccResult, TreeError, TreeErrorKind, ValueErrorKind};
use log::debug;

/// The loop marker of `loop_node`, creating one if it has none.
///
/// Repeated calls return the same marker.
pub fn ensure_loop_marker<T: NodeTree + ?Sized>(tree: &mut T, loop_node: NodeId) -> AccResult<NodeId> {
    family::expect_kind(tree, loop_node, NodeKind::Loop)?;
    if !has_region_marker(tree, loop_node)? {
        return value_error(
            ValueErrorKind::MissingRegionMarker,
            "Cannot apply a loop clause without a region marker.",
        );
    }
    match directives::loop_marker_of(tree, loop_node)? {
        Some(marker) => Ok(marker),
        None => directives::apply_loop_marker(tree, loop_node, &LoopMarkerOptions::default()),
    }
}

/// Clause record of the active loop marker of `loop_node`, if any.
pub fn loop_clauses<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<Option<&LoopClauses>> {
    if !has_loop_marker(tree, loop_node)? {
        return Ok(None);
    }
    Ok(directives::loop_marker_of(tree, loop_node)?.and_then(|m| tree.clauses(m)))
}

fn marked_clauses<T: NodeTree + ?Sized>(tree: &mut T, loop_node: NodeId) -> AccResult<&mut LoopClauses> {
    let marker = ensure_loop_marker(tree, loop_node)?;
    tree.clauses_mut(marker).ok_or_else(|| {
        TreeError::new(TreeErrorKind::UnknownNode, "Loop marker carries no clause record.")
            .with_node(marker)
            .into()
    })
}

pub fn has_seq_clause<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<bool> {
    Ok(loop_clauses(tree, loop_node)?.is_some_and(LoopClauses::sequential))
}

pub fn has_gang_clause<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<bool> {
    Ok(loop_clauses(tree, loop_node)?.is_some_and(LoopClauses::gang))
}

pub fn has_vector_clause<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<bool> {
    Ok(loop_clauses(tree, loop_node)?.is_some_and(LoopClauses::vector))
}

/// Mark `loop_node` to run sequentially.
pub fn apply_loop_seq<T: NodeTree + ?Sized>(tree: &mut T, loop_node: NodeId) -> AccResult<()> {
    marked_clauses(tree, loop_node)?.set_sequential()?;
    debug!("applied seq to loop {}", loop_node);
    Ok(())
}

/// Distribute the iterations of `loop_node` across gangs.
pub fn apply_loop_gang<T: NodeTree + ?Sized>(tree: &mut T, loop_node: NodeId) -> AccResult<()> {
    marked_clauses(tree, loop_node)?.set_gang()?;
    debug!("applied gang to loop {}", loop_node);
    Ok(())
}

/// Vectorise `loop_node`.
pub fn apply_loop_vector<T: NodeTree + ?Sized>(tree: &mut T, loop_node: NodeId) -> AccResult<()> {
    marked_clauses(tree, loop_node)?.set_vector()?;
    debug!("applied vector to loop {}", loop_node);
    Ok(())
}

/// Check whether `loop_node` lies within a collapsed nest.
///
/// The nearest enclosing loop (or `loop_node` itself) whose marker sets
/// `collapse(n)` decides: it covers `loop_node` iff `n` exceeds the number
/// of loop levels between them.
pub fn has_collapse_clause<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<bool> {
    family::expect_kind(tree, loop_node, NodeKind::Loop)?;
    if !has_region_marker(tree, loop_node)? {
        return Ok(false);
    }
    let enclosing = family::ancestors(tree, loop_node, &Query::of(NodeKind::Loop).inclusive())?;
    for (distance, ancestor) in enclosing.into_iter().enumerate() {
        if let Some(collapse) = loop_clauses(tree, ancestor)?.and_then(LoopClauses::collapse) {
            return Ok(collapse > distance);
        }
    }
    Ok(false)
}

/// Collapse the `depth` outer-most loops of the sub-nest rooted at `loop_node`.
pub fn apply_loop_collapse<T: NodeTree + ?Sized>(tree: &mut T, loop_node: NodeId, depth: usize) -> AccResult<()> {
    family::expect_kind(tree, loop_node, NodeKind::Loop)?;
    if !has_region_marker(tree, loop_node)? {
        return value_error(
            ValueErrorKind::MissingRegionMarker,
            "Cannot apply a loop clause without a region marker.",
        );
    }
    if depth <= 1 {
        return value_error(
            ValueErrorKind::CollapseTooSmall,
            format!("Expected an integer greater than one, not {}.", depth),
        );
    }
    let available = family::descendants(tree, loop_node, &Query::of(NodeKind::Loop).inclusive())?.len();
    if available < depth {
        return value_error(
            ValueErrorKind::CollapseTooLarge,
            format!("Cannot apply collapse to {} loops in a sub-nest of {}.", depth, available),
        );
    }
    marked_clauses(tree, loop_node)?.set_collapse(depth);
    debug!("applied collapse({}) to loop {}", depth, loop_node);
    Ok(())
}

/// Collapse as many leading levels as are perfectly nested below `loop_node`.
///
/// Returns the depth applied.
pub fn apply_default_collapse<T: NodeTree + ?Sized>(tree: &mut T, loop_node: NodeId) -> AccResult<usize> {
    let depth = perfect_nest_depth(tree, loop_node)?;
    apply_loop_collapse(tree, loop_node, depth)?;
    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::{apply_region_marker, RegionOptions};
    use crate::ir::ast::{Expr, Stmt};
    use crate::ir::Tree;

    fn region_nest(iterators: &[&str]) -> (Tree, Vec<NodeId>) {
        let body = vec![Stmt::assign("a", iterators, Expr::real("0.0"))];
        let mut tree = Tree::from_stmts(&Stmt::loop_nest(iterators, 8, body));
        let loops = tree.loops();
        apply_region_marker(&mut tree, &[loops[0]], &RegionOptions::new()).unwrap();
        (tree, loops)
    }

    #[test]
    fn test_clause_requires_region() {
        let body = vec![Stmt::assign("a", &["i"], Expr::real("0.0"))];
        let mut tree = Tree::from_stmts(&[Stmt::for_loop("i", 8, body)]);
        let lp = tree.loops()[0];
        for result in [
            apply_loop_seq(&mut tree, lp),
            apply_loop_gang(&mut tree, lp),
            apply_loop_vector(&mut tree, lp),
            apply_loop_collapse(&mut tree, lp, 2),
        ] {
            assert_eq!(result.unwrap_err().value_kind(), Some(ValueErrorKind::MissingRegionMarker));
        }
        assert!(!has_collapse_clause(&tree, lp).unwrap());
        assert!(loop_clauses(&tree, lp).unwrap().is_none());
    }

    #[test]
    fn test_ensure_loop_marker_is_idempotent() {
        let (mut tree, loops) = region_nest(&["j", "i"]);
        let first = ensure_loop_marker(&mut tree, loops[1]).unwrap();
        let size = tree.len();
        let second = ensure_loop_marker(&mut tree, loops[1]).unwrap();
        assert_eq!(first, second);
        assert_eq!(tree.len(), size);
    }

    #[test]
    fn test_lazy_promotion_and_exclusivity() {
        let (mut tree, loops) = region_nest(&["j", "i"]);
        apply_loop_gang(&mut tree, loops[0]).unwrap();
        assert!(has_loop_marker(&tree, loops[0]).unwrap());
        let err = apply_loop_seq(&mut tree, loops[0]).unwrap_err();
        assert_eq!(err.value_kind(), Some(ValueErrorKind::ClauseConflict));
        apply_loop_vector(&mut tree, loops[0]).unwrap();

        apply_loop_seq(&mut tree, loops[1]).unwrap();
        let err = apply_loop_gang(&mut tree, loops[1]).unwrap_err();
        assert_eq!(err.to_string(), "Value error: Cannot apply gang to a loop with a seq clause.");
        assert!(has_seq_clause(&tree, loops[1]).unwrap());
        assert!(!has_gang_clause(&tree, loops[1]).unwrap());
        assert!(has_gang_clause(&tree, loops[0]).unwrap());
        assert!(has_vector_clause(&tree, loops[0]).unwrap());
    }

    #[test]
    fn test_collapse_bounds() {
        let (mut tree, loops) = region_nest(&["k", "j"]);
        let err = apply_loop_collapse(&mut tree, loops[0], 1).unwrap_err();
        assert_eq!(err.value_kind(), Some(ValueErrorKind::CollapseTooSmall));
        assert_eq!(err.to_string(), "Value error: Expected an integer greater than one, not 1.");
        let err = apply_loop_collapse(&mut tree, loops[0], 3).unwrap_err();
        assert_eq!(err.to_string(), "Value error: Cannot apply collapse to 3 loops in a sub-nest of 2.");
        assert!(!has_loop_marker(&tree, loops[0]).unwrap());
        apply_loop_collapse(&mut tree, loops[0], 2).unwrap();
        assert_eq!(loop_clauses(&tree, loops[0]).unwrap().and_then(LoopClauses::collapse), Some(2));
    }

    #[test]
    fn test_collapse_covers_sub_nest_only() {
        let (mut tree, loops) = region_nest(&["k", "j", "i"]);
        apply_loop_collapse(&mut tree, loops[0], 2).unwrap();
        assert!(has_collapse_clause(&tree, loops[0]).unwrap());
        assert!(has_collapse_clause(&tree, loops[1]).unwrap());
        assert!(!has_collapse_clause(&tree, loops[2]).unwrap());
    }

    #[test]
    fn test_inner_collapse_shadows_outer() {
        let (mut tree, loops) = region_nest(&["l", "k", "j", "i"]);
        apply_loop_collapse(&mut tree, loops[0], 4).unwrap();
        apply_loop_gang(&mut tree, loops[2]).unwrap();
        assert!(has_collapse_clause(&tree, loops[3]).unwrap());
        apply_loop_collapse(&mut tree, loops[1], 2).unwrap();
        assert!(has_collapse_clause(&tree, loops[2]).unwrap());
        assert!(!has_collapse_clause(&tree, loops[3]).unwrap());
    }

    #[test]
    fn test_default_collapse() {
        let (mut tree, loops) = region_nest(&["k", "j", "i"]);
        assert_eq!(apply_default_collapse(&mut tree, loops[0]).unwrap(), 3);
        assert!(has_collapse_clause(&tree, loops[2]).unwrap());

        // k { s = 1 ; j { i { a = 0 } } }
        let mut body = vec![Stmt::assign_scalar("s", Expr::int(1))];
        body.extend(Stmt::loop_nest(&["j", "i"], 4, vec![Stmt::assign("a", &["i"], Expr::int(0))]));
        let mut tree = Tree::from_stmts(&[Stmt::for_loop("k", 4, body)]);
        let outer = tree.loops()[0];
        apply_region_marker(&mut tree, &[outer], &RegionOptions::new()).unwrap();
        let err = apply_default_collapse(&mut tree, outer).unwrap_err();
        assert_eq!(err.to_string(), "Value error: Expected an integer greater than one, not 1.");
    }
}
