//! Family relations between nodes: ancestors, descendants, children, siblings.
//!
//! Two views of the tree are used. The raw view is whatever
//! [`NodeTree::parent_of`] and [`NodeTree::children_of`] report. The logical
//! view skips the `Schedule` book-keeping layer that holds every statement
//! list, so a loop's logical children are the statements of its body, and
//! steps transparently through a lone `Kernel` wrapper.

use crate::ir::{KindSet, NodeId, NodeKind, NodeTree};
use crate::utils::errors::{AccResult, KindError, TreeError};
use log::trace;

/// Filter applied by the ancestor, descendant and sibling searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    /// Kinds to return
    pub kinds: KindSet,
    /// Whether the starting node itself may be returned
    pub inclusive: bool,
    /// Kinds never returned, even when listed in `kinds`
    pub exclude: KindSet,
    /// Only return nodes at exactly this raw depth
    pub depth: Option<usize>,
}

impl Query {
    /// Match nodes of any kind.
    pub fn any() -> Self {
        Self::kinds(KindSet::ANY)
    }

    /// Match nodes of a single kind.
    pub fn of(kind: NodeKind) -> Self {
        Self::kinds(KindSet::of(kind))
    }

    /// Match nodes whose kind is in `kinds`.
    pub fn kinds(kinds: KindSet) -> Self {
        Self {
            kinds,
            inclusive: false,
            exclude: KindSet::NONE,
            depth: None,
        }
    }

    /// Also consider the starting node.
    pub fn inclusive(mut self) -> Self {
        self.inclusive = true;
        self
    }

    /// Never return nodes of these kinds.
    pub fn excluding(mut self, exclude: impl Into<KindSet>) -> Self {
        self.exclude = exclude.into();
        self
    }

    /// Only return nodes at raw depth `depth`.
    pub fn at_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Check whether a node of `kind` passes the kind filters.
    pub fn accepts(&self, kind: NodeKind) -> bool {
        self.kinds.contains(kind) && !self.exclude.contains(kind)
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::any()
    }
}

/// Kind of `node`, failing if the tree does not own it.
pub fn check_node<T: NodeTree + ?Sized>(tree: &T, node: NodeId) -> AccResult<NodeKind> {
    tree.node_kind(node).ok_or_else(|| TreeError::unknown(node).into())
}

/// Fail with a type error unless `node` is of kind `expected`.
pub fn expect_kind<T: NodeTree + ?Sized>(tree: &T, node: NodeId, expected: NodeKind) -> AccResult<()> {
    let found = check_node(tree, node)?;
    if found != expected {
        return Err(KindError::new(expected, found).into());
    }
    Ok(())
}

/// Descendants of `node` matching `query`, in pre-order.
pub fn descendants<T: NodeTree + ?Sized>(tree: &T, node: NodeId, query: &Query) -> AccResult<Vec<NodeId>> {
    check_node(tree, node)?;
    let found = tree
        .walk(node)
        .into_iter()
        .filter(|d| query.inclusive || *d != node)
        .filter(|d| tree.node_kind(*d).is_some_and(|k| query.accepts(k)))
        .filter(|d| query.depth.map_or(true, |depth| tree.depth(*d) == depth))
        .collect();
    Ok(found)
}

/// Ancestors of `node` matching `query`, nearest first.
pub fn ancestors<T: NodeTree + ?Sized>(tree: &T, node: NodeId, query: &Query) -> AccResult<Vec<NodeId>> {
    check_node(tree, node)?;
    let mut found = Vec::new();
    let mut current = if query.inclusive {
        Some(node)
    } else {
        tree.parent_of(node)
    };
    while let Some(n) = current {
        let matches = tree.node_kind(n).is_some_and(|k| query.accepts(k))
            && query.depth.map_or(true, |depth| tree.depth(n) == depth);
        if matches {
            found.push(n);
        }
        current = tree.parent_of(n);
    }
    Ok(found)
}

/// Statements held directly by `node`, one logical level down.
fn logical_children<T: NodeTree + ?Sized>(tree: &T, node: NodeId) -> Vec<NodeId> {
    tree.children_of(node)
        .iter()
        .filter(|c| tree.node_kind(**c) == Some(NodeKind::Schedule))
        .flat_map(|schedule| tree.children_of(*schedule).iter().copied())
        .collect()
}

/// Logical children of `node` whose kind is in `kinds` and not in `exclude`.
///
/// A lone `Kernel` child is looked through.
pub fn children<T: NodeTree + ?Sized>(
    tree: &T,
    node: NodeId,
    kinds: KindSet,
    exclude: KindSet,
) -> AccResult<Vec<NodeId>> {
    check_node(tree, node)?;
    let mut current = node;
    let mut found = logical_children(tree, current);
    while let [only] = found.as_slice() {
        if tree.node_kind(*only) != Some(NodeKind::Kernel) || *only == current {
            break;
        }
        trace!("looking through kernel {} below {}", only, node);
        current = *only;
        found = logical_children(tree, current);
    }
    found.retain(|c| tree.node_kind(*c).is_some_and(|k| kinds.contains(k) && !exclude.contains(k)));
    Ok(found)
}

/// Logical parent of `node`, or `None` at the root.
///
/// Skips the `Schedule` layer and any `Kernel` wrapper above it.
pub fn parent<T: NodeTree + ?Sized>(tree: &T, node: NodeId) -> AccResult<Option<NodeId>> {
    check_node(tree, node)?;
    let mut current = node;
    loop {
        let Some(mut p) = tree.parent_of(current) else {
            return Ok(None);
        };
        if tree.node_kind(p) == Some(NodeKind::Schedule) {
            match tree.parent_of(p) {
                Some(owner) => p = owner,
                None => return Ok(None),
            }
        }
        if tree.node_kind(p) == Some(NodeKind::Kernel) {
            current = p;
            continue;
        }
        return Ok(Some(p));
    }
}

/// Nodes sharing the raw parent of `node`, in source order.
///
/// The `depth` filter of `query` is ignored: siblings share a depth.
pub fn siblings<T: NodeTree + ?Sized>(tree: &T, node: NodeId, query: &Query) -> AccResult<Vec<NodeId>> {
    check_node(tree, node)?;
    let all = match tree.parent_of(node) {
        Some(p) => tree.children_of(p).to_vec(),
        None => vec![node],
    };
    Ok(all
        .into_iter()
        .filter(|s| query.inclusive || *s != node)
        .filter(|s| tree.node_kind(*s).is_some_and(|k| query.accepts(k)))
        .collect())
}

/// Check whether `node` has a descendant of a kind in `kinds`.
pub fn has_descendant<T: NodeTree + ?Sized>(
    tree: &T,
    node: NodeId,
    kinds: impl Into<KindSet>,
    inclusive: bool,
) -> AccResult<bool> {
    let mut query = Query::kinds(kinds.into());
    query.inclusive = inclusive;
    Ok(!descendants(tree, node, &query)?.is_empty())
}

/// Check whether `node` has an ancestor of a kind in `kinds`.
pub fn has_ancestor<T: NodeTree + ?Sized>(
    tree: &T,
    node: NodeId,
    kinds: impl Into<KindSet>,
    inclusive: bool,
) -> AccResult<bool> {
    let mut query = Query::kinds(kinds.into());
    query.inclusive = inclusive;
    Ok(!ancestors(tree, node, &query)?.is_empty())
}

/// Check whether all `nodes` share the same raw parent.
///
/// Zero or one node trivially qualifies.
pub fn are_siblings<T: NodeTree + ?Sized>(tree: &T, nodes: &[NodeId]) -> AccResult<bool> {
    for node in nodes {
        check_node(tree, *node)?;
    }
    let Some((first, rest)) = nodes.split_first() else {
        return Ok(true);
    };
    let parent = tree.parent_of(*first);
    Ok(rest.iter().all(|n| tree.parent_of(*n) == parent))
}

/// Check whether `second` immediately follows `first` under the same parent.
pub fn is_next_sibling<T: NodeTree + ?Sized>(tree: &T, first: NodeId, second: NodeId) -> AccResult<bool> {
    if !are_siblings(tree, &[first, second])? || tree.parent_of(first).is_none() {
        return Ok(false);
    }
    Ok(tree.position(first) + 1 == tree.position(second) && tree.following(first).contains(&second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ast::{Expr, Stmt};
    use crate::ir::Tree;
    use crate::utils::errors::AccError;

    fn triple_nest() -> Tree {
        let body = vec![Stmt::assign("a", &["i", "j", "k"], Expr::real("0.0"))];
        Tree::from_stmts(&Stmt::loop_nest(&["k", "j", "i"], 4, body))
    }

    #[test]
    fn test_descendants_filters() {
        let tree = triple_nest();
        let loops = tree.loops();
        let outer = loops[0];
        assert_eq!(descendants(&tree, outer, &Query::of(NodeKind::Loop)).unwrap(), loops[1..]);
        assert_eq!(
            descendants(&tree, outer, &Query::of(NodeKind::Loop).inclusive()).unwrap(),
            loops
        );
        let at_depth = Query::of(NodeKind::Loop).at_depth(tree.depth(loops[1]));
        assert_eq!(descendants(&tree, outer, &at_depth).unwrap(), vec![loops[1]]);
        let no_refs = Query::kinds(NodeKind::Reference | NodeKind::Loop).excluding(NodeKind::Reference);
        assert_eq!(descendants(&tree, outer, &no_refs).unwrap(), loops[1..]);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let tree = triple_nest();
        let loops = tree.loops();
        let inner = loops[2];
        assert_eq!(
            ancestors(&tree, inner, &Query::of(NodeKind::Loop)).unwrap(),
            vec![loops[1], loops[0]]
        );
        assert_eq!(
            ancestors(&tree, inner, &Query::of(NodeKind::Loop).inclusive()).unwrap(),
            vec![inner, loops[1], loops[0]]
        );
        let deep = Query::of(NodeKind::Loop).at_depth(tree.depth(loops[0]));
        assert_eq!(ancestors(&tree, inner, &deep).unwrap(), vec![loops[0]]);
    }

    #[test]
    fn test_children_and_parent_skip_schedule() {
        let tree = triple_nest();
        let loops = tree.loops();
        assert_eq!(
            children(&tree, loops[0], KindSet::ANY, KindSet::NONE).unwrap(),
            vec![loops[1]]
        );
        assert_eq!(parent(&tree, loops[1]).unwrap(), Some(loops[0]));
        assert_eq!(parent(&tree, loops[0]).unwrap(), Some(tree.root()));
        assert_eq!(parent(&tree, tree.root()).unwrap(), None);
    }

    #[test]
    fn test_children_look_through_kernel() {
        let inner = Stmt::loop_nest(&["j", "i"], 4, vec![Stmt::assign_scalar("x", Expr::int(0))]);
        let tree = Tree::from_stmts(&[Stmt::Kernel { body: inner }]);
        let loops = tree.loops();
        assert_eq!(
            children(&tree, tree.root(), KindSet::of(NodeKind::Loop), KindSet::NONE).unwrap(),
            vec![loops[0]]
        );
        assert_eq!(parent(&tree, loops[0]).unwrap(), Some(tree.root()));
    }

    #[test]
    fn test_siblings_and_next_sibling() {
        let stmts = vec![
            Stmt::assign_scalar("x", Expr::int(1)),
            Stmt::for_loop("i", 4, vec![Stmt::assign("a", &["i"], Expr::int(0))]),
            Stmt::assign_scalar("y", Expr::int(2)),
        ];
        let tree = Tree::from_stmts(&stmts);
        let top = tree.children_of(tree.body()).to_vec();
        assert_eq!(siblings(&tree, top[0], &Query::any()).unwrap(), vec![top[1], top[2]]);
        assert_eq!(
            siblings(&tree, top[0], &Query::of(NodeKind::Assignment).inclusive()).unwrap(),
            vec![top[0], top[2]]
        );
        assert!(is_next_sibling(&tree, top[0], top[1]).unwrap());
        assert!(!is_next_sibling(&tree, top[1], top[0]).unwrap());
        assert!(!is_next_sibling(&tree, top[0], top[2]).unwrap());
        assert!(are_siblings(&tree, &top).unwrap());

        let nested = tree.nodes_of_kind(NodeKind::Assignment)[1];
        assert!(!are_siblings(&tree, &[top[0], nested]).unwrap());
    }

    #[test]
    fn test_has_queries() {
        let tree = triple_nest();
        let loops = tree.loops();
        assert!(has_descendant(&tree, loops[0], NodeKind::Loop, false).unwrap());
        assert!(!has_descendant(&tree, loops[2], NodeKind::Loop, false).unwrap());
        assert!(has_descendant(&tree, loops[2], NodeKind::Loop, true).unwrap());
        assert!(!has_ancestor(&tree, loops[0], NodeKind::Loop, false).unwrap());
        assert!(has_ancestor(&tree, loops[2], NodeKind::Loop, false).unwrap());
    }

    #[test]
    fn test_kind_and_handle_checks() {
        let tree = triple_nest();
        let assign = tree.nodes_of_kind(NodeKind::Assignment)[0];
        let err = expect_kind(&tree, assign, NodeKind::Loop).unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(err.to_string(), "Type error: Expected a Loop, not 'Assignment'.");
        assert!(matches!(
            descendants(&tree, NodeId(10_000), &Query::any()),
            Err(AccError::Tree(_))
        ));
    }

    #[test]
    fn test_exclusion_filters() {
        let body = vec![
            Stmt::assign_scalar("x", Expr::int(1)),
            Stmt::for_loop("j", 4, vec![Stmt::assign("a", &["j"], Expr::int(0))]),
            Stmt::if_then(Expr::var("p"), vec![Stmt::assign_scalar("y", Expr::int(2))]),
        ];
        let tree = Tree::from_stmts(&[Stmt::for_loop("i", 4, body)]);
        let loops = tree.loops();
        let top = children(&tree, loops[0], KindSet::ANY, KindSet::NONE).unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(
            children(&tree, loops[0], KindSet::ANY, KindSet::of(NodeKind::Assignment)).unwrap(),
            vec![top[1], top[2]]
        );
        assert!(children(&tree, loops[0], KindSet::of(NodeKind::Loop), KindSet::of(NodeKind::Loop))
            .unwrap()
            .is_empty());

        let inner_assign = tree.children_of(tree.children_of(loops[1])[3])[0];
        let skip_lists = Query::any().excluding(NodeKind::Schedule);
        assert_eq!(
            ancestors(&tree, inner_assign, &skip_lists).unwrap(),
            vec![loops[1], loops[0], tree.root()]
        );
        let loops_only = Query::kinds(NodeKind::Loop | NodeKind::Other).excluding(NodeKind::Other);
        assert_eq!(ancestors(&tree, inner_assign, &loops_only).unwrap(), vec![loops[1], loops[0]]);
    }
}
