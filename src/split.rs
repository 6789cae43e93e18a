//! Grouping nodes into runs of directly consecutive siblings.

use crate::directives::{apply_region_marker, check_region_block, RegionOptions};
use crate::family::{self, is_next_sibling};
use crate::ir::{NodeId, NodeTree};
use crate::utils::errors::{value_error, AccResult, ValueErrorKind};
use log::{debug, trace};

/// Split `nodes` into maximal runs where each node directly follows the
/// previous one.
///
/// Nodes are grouped by depth first, in order of first appearance; every
/// input node appears in exactly one run.
pub fn split_consecutive<T: NodeTree + ?Sized>(tree: &T, nodes: &[NodeId]) -> AccResult<Vec<Vec<NodeId>>> {
    // (depth, finished runs, current run)
    let mut groups: Vec<(usize, Vec<Vec<NodeId>>, Vec<NodeId>)> = Vec::new();
    for node in nodes {
        family::check_node(tree, *node)?;
        let depth = tree.depth(*node);
        let Some(idx) = groups.iter().position(|(d, _, _)| *d == depth) else {
            groups.push((depth, Vec::new(), vec![*node]));
            continue;
        };
        let (_, runs, current) = &mut groups[idx];
        let follows = match current.last() {
            Some(previous) => is_next_sibling(tree, *previous, *node)?,
            None => false,
        };
        if follows {
            current.push(*node);
        } else {
            runs.push(std::mem::replace(current, vec![*node]));
        }
    }

    let mut out = Vec::new();
    for (depth, mut runs, current) in groups {
        if !current.is_empty() {
            runs.push(current);
        }
        trace!("depth {}: {} run(s)", depth, runs.len());
        out.extend(runs);
    }
    Ok(out)
}

/// [`split_consecutive`] for nodes that must all sit at one depth.
pub fn split_consecutive_strict<T: NodeTree + ?Sized>(tree: &T, nodes: &[NodeId]) -> AccResult<Vec<Vec<NodeId>>> {
    let mut depths = Vec::with_capacity(nodes.len());
    for node in nodes {
        family::check_node(tree, *node)?;
        depths.push(tree.depth(*node));
    }
    if depths.windows(2).any(|w| w[0] != w[1]) {
        return value_error(ValueErrorKind::MixedDepth, "nodes must share a single depth");
    }
    split_consecutive(tree, nodes)
}

/// Wrap each run of consecutive siblings in `nodes` in its own region marker.
///
/// Every run is validated before the first one is wrapped, so a rejected
/// run leaves the tree untouched. Returns the new markers in run order.
pub fn apply_region_markers_to_runs<T: NodeTree + ?Sized>(
    tree: &mut T,
    nodes: &[NodeId],
    options: &RegionOptions,
) -> AccResult<Vec<NodeId>> {
    let runs = split_consecutive_strict(tree, nodes)?;
    for run in &runs {
        check_region_block(tree, run)?;
    }
    let mut markers = Vec::with_capacity(runs.len());
    for run in &runs {
        markers.push(apply_region_marker(tree, run, options)?);
    }
    debug!("applied {} region marker(s) over {} node(s)", markers.len(), nodes.len());
    Ok(markers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ast::{Expr, Stmt};
    use crate::ir::{NodeKind, Tree};

    fn three_assignments_in_loop() -> (Tree, Vec<NodeId>) {
        let body = vec![
            Stmt::assign("a", &["i"], Expr::int(1)),
            Stmt::assign("b", &["i"], Expr::int(2)),
            Stmt::assign("c", &["i"], Expr::int(3)),
        ];
        let tree = Tree::from_stmts(&[Stmt::for_loop("i", 4, body)]);
        let assigns = tree.nodes_of_kind(NodeKind::Assignment);
        (tree, assigns)
    }

    #[test]
    fn test_consecutive_run() {
        let (tree, assigns) = three_assignments_in_loop();
        assert_eq!(split_consecutive(&tree, &assigns).unwrap(), vec![assigns.clone()]);
    }

    #[test]
    fn test_gap_splits_run() {
        let (tree, assigns) = three_assignments_in_loop();
        let every_other = [assigns[0], assigns[2]];
        assert_eq!(
            split_consecutive(&tree, &every_other).unwrap(),
            vec![vec![assigns[0]], vec![assigns[2]]]
        );
        assert!(split_consecutive(&tree, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_mixed_depths() {
        let stmts = vec![
            Stmt::assign_scalar("x", Expr::int(0)),
            Stmt::for_loop("i", 4, vec![Stmt::assign("a", &["i"], Expr::int(1))]),
            Stmt::assign_scalar("y", Expr::int(0)),
        ];
        let tree = Tree::from_stmts(&stmts);
        let assigns = tree.nodes_of_kind(NodeKind::Assignment);
        let lp = tree.loops()[0];
        let input = [assigns[0], assigns[1], lp, assigns[2]];
        let runs = split_consecutive(&tree, &input).unwrap();
        assert_eq!(runs, vec![vec![assigns[0], lp, assigns[2]], vec![assigns[1]]]);
        assert_eq!(runs.iter().map(Vec::len).sum::<usize>(), input.len());

        let err = split_consecutive_strict(&tree, &input).unwrap_err();
        assert_eq!(err.value_kind(), Some(ValueErrorKind::MixedDepth));
        assert_eq!(err.to_string(), "Value error: nodes must share a single depth");
    }

    #[test]
    fn test_region_markers_per_run() {
        let stmts = vec![
            Stmt::assign_scalar("x", Expr::int(0)),
            Stmt::assign_scalar("y", Expr::int(1)),
            Stmt::call("sync", vec![]),
            Stmt::assign_scalar("z", Expr::int(2)),
        ];
        let mut tree = Tree::from_stmts(&stmts);
        let assigns = tree.nodes_of_kind(NodeKind::Assignment);
        let markers = apply_region_markers_to_runs(&mut tree, &assigns, &RegionOptions::new()).unwrap();
        assert_eq!(markers.len(), 2);
        let top = tree.children_of(tree.body()).to_vec();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0], markers[0]);
        assert_eq!(top[2], markers[1]);
    }

    #[test]
    fn test_rejected_run_leaves_earlier_runs_unwrapped() {
        let stmts = vec![
            Stmt::assign_scalar("x", Expr::int(0)),
            Stmt::call("sync", vec![]),
            Stmt::assign_scalar("z", Expr::int(2)),
        ];
        let mut tree = Tree::from_stmts(&stmts);
        let assigns = tree.nodes_of_kind(NodeKind::Assignment);
        let existing = apply_region_marker(&mut tree, &[assigns[1]], &RegionOptions::new()).unwrap();
        let before = tree.children_of(tree.body()).to_vec();

        let err = apply_region_markers_to_runs(&mut tree, &[assigns[0], existing], &RegionOptions::new())
            .unwrap_err();
        assert_eq!(err.value_kind(), Some(ValueErrorKind::AlreadyMarked));
        assert_eq!(tree.children_of(tree.body()), before.as_slice());
        assert!(!crate::directives::has_region_marker(&tree, assigns[0]).unwrap());
    }
}
