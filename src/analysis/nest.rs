//! Loop-nest shape predicates.
//!
//! Nest queries look through RegionMarker and LoopMarker wrappers, so marking
//! a loop never changes the shape of the nest it belongs to.

use crate::family::{self, Query};
use crate::ir::{KindSet, NodeId, NodeKind, NodeTree};
use crate::utils::errors::{value_error, AccResult, TreeError, TreeErrorKind, ValueErrorKind};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How loop bodies are classified when judging nest shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestPolicy {
    /// Kinds that never count as content at a nest level
    pub ignored_kinds: KindSet,
    /// Whether an `if` whose branches hold only literal assignments is a
    /// simple innermost body
    pub guarded_assignments_are_simple: bool,
}

impl Default for NestPolicy {
    fn default() -> Self {
        Self {
            ignored_kinds: NodeKind::Literal | NodeKind::Reference,
            guarded_assignments_are_simple: false,
        }
    }
}

impl NestPolicy {
    pub fn with_ignored_kinds(mut self, kinds: KindSet) -> Self {
        self.ignored_kinds = kinds;
        self
    }

    pub fn with_guarded_assignments(mut self, simple: bool) -> Self {
        self.guarded_assignments_are_simple = simple;
        self
    }
}

/// Logical children of `node`, with directive markers replaced by what they wrap.
pub fn nest_children<T: NodeTree + ?Sized>(tree: &T, node: NodeId) -> AccResult<Vec<NodeId>> {
    let mut out = Vec::new();
    for child in family::children(tree, node, KindSet::ANY, KindSet::NONE)? {
        if tree.node_kind(child).is_some_and(NodeKind::is_marker) {
            out.extend(nest_children(tree, child)?);
        } else {
            out.push(child);
        }
    }
    Ok(out)
}

/// Logical parent of `node`, skipping directive markers.
pub fn nest_parent<T: NodeTree + ?Sized>(tree: &T, node: NodeId) -> AccResult<Option<NodeId>> {
    let mut current = family::parent(tree, node)?;
    while let Some(p) = current {
        if !tree.node_kind(p).is_some_and(NodeKind::is_marker) {
            break;
        }
        current = family::parent(tree, p)?;
    }
    Ok(current)
}

/// Check whether `loop_node` has no enclosing Loop.
pub fn is_outer_loop<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<bool> {
    family::expect_kind(tree, loop_node, NodeKind::Loop)?;
    Ok(!family::has_ancestor(tree, loop_node, NodeKind::Loop, false)?)
}

/// Number of distinct loop levels in the sub-nest rooted at `loop_node`.
pub fn nest_depth_count<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<usize> {
    family::expect_kind(tree, loop_node, NodeKind::Loop)?;
    let inner_loops = family::descendants(tree, loop_node, &Query::of(NodeKind::Loop).inclusive())?;
    let mut levels = BTreeSet::new();
    for inner in inner_loops {
        let enclosing = family::ancestors(tree, inner, &Query::of(NodeKind::Loop).inclusive())?;
        if let Some(level) = enclosing.iter().position(|a| *a == loop_node) {
            levels.insert(level);
        }
    }
    Ok(levels.len())
}

/// Loops along the leading perfectly nested chain from `loop_node`, and
/// whether the chain reaches the innermost level cleanly.
fn perfect_chain<T: NodeTree + ?Sized>(
    tree: &T,
    loop_node: NodeId,
    policy: &NestPolicy,
) -> AccResult<(Vec<NodeId>, bool)> {
    let mut chain = vec![loop_node];
    let mut current = loop_node;
    loop {
        let (loops, others): (Vec<NodeId>, Vec<NodeId>) = nest_children(tree, current)?
            .into_iter()
            .partition(|c| tree.node_kind(*c) == Some(NodeKind::Loop));
        let content: Vec<NodeId> = others
            .into_iter()
            .filter(|c| tree.node_kind(*c).is_some_and(|k| !policy.ignored_kinds.contains(k)))
            .collect();

        if let ([next], []) = (loops.as_slice(), content.as_slice()) {
            current = *next;
            chain.push(current);
            continue;
        }

        let mut perfect = loops.is_empty();
        for node in &content {
            if !perfect {
                break;
            }
            perfect = !family::has_descendant(tree, *node, NodeKind::Loop, false)?;
        }
        trace!("perfect chain from {}: {} level(s), clean={}", loop_node, chain.len(), perfect);
        return Ok((chain, perfect));
    }
}

/// Check whether every level below `loop_node` holds exactly the next loop.
pub fn is_perfectly_nested<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<bool> {
    is_perfectly_nested_with(tree, loop_node, &NestPolicy::default())
}

/// [`is_perfectly_nested`] under an explicit [`NestPolicy`].
///
/// Fails with `NotOuterMost` when `loop_node` is the only content of its
/// enclosing loop's body, since the nest then starts further out.
pub fn is_perfectly_nested_with<T: NodeTree + ?Sized>(
    tree: &T,
    loop_node: NodeId,
    policy: &NestPolicy,
) -> AccResult<bool> {
    check_outer_most(tree, loop_node, policy)?;
    Ok(perfect_chain(tree, loop_node, policy)?.1)
}

/// Fail unless `loop_node` heads its own (sub-)nest.
fn check_outer_most<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId, policy: &NestPolicy) -> AccResult<()> {
    family::expect_kind(tree, loop_node, NodeKind::Loop)?;
    if let Some(enclosing) = nest_parent(tree, loop_node)? {
        if tree.node_kind(enclosing) == Some(NodeKind::Loop) {
            let content: Vec<NodeId> = nest_children(tree, enclosing)?
                .into_iter()
                .filter(|c| tree.node_kind(*c).is_some_and(|k| !policy.ignored_kinds.contains(k)))
                .collect();
            if content == [loop_node] {
                return value_error(
                    ValueErrorKind::NotOuterMost,
                    "Perfect nesting must be checked from the outer-most loop of its nest.",
                );
            }
        }
    }
    Ok(())
}

/// Number of leading perfectly nested levels from `loop_node`, inclusive.
///
/// Unlike [`is_perfectly_nested`] this may be asked of any loop.
pub fn perfect_nest_depth<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<usize> {
    perfect_nest_depth_with(tree, loop_node, &NestPolicy::default())
}

pub fn perfect_nest_depth_with<T: NodeTree + ?Sized>(
    tree: &T,
    loop_node: NodeId,
    policy: &NestPolicy,
) -> AccResult<usize> {
    family::expect_kind(tree, loop_node, NodeKind::Loop)?;
    Ok(perfect_chain(tree, loop_node, policy)?.0.len())
}

/// Check whether `loop_node` heads a perfect nest whose innermost body is
/// only literal-valued assignments.
///
/// Like [`is_perfectly_nested`], fails with `NotOuterMost` inside a nest.
pub fn is_simple_loop<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<bool> {
    is_simple_loop_with(tree, loop_node, &NestPolicy::default())
}

pub fn is_simple_loop_with<T: NodeTree + ?Sized>(
    tree: &T,
    loop_node: NodeId,
    policy: &NestPolicy,
) -> AccResult<bool> {
    check_outer_most(tree, loop_node, policy)?;
    let (chain, perfect) = perfect_chain(tree, loop_node, policy)?;
    let Some(innermost) = chain.last().copied().filter(|_| perfect) else {
        return Ok(false);
    };
    is_simple_body(tree, innermost, policy)
}

/// Non-empty statement list made only of literal assignments.
fn is_simple_body<T: NodeTree + ?Sized>(tree: &T, owner: NodeId, policy: &NestPolicy) -> AccResult<bool> {
    let body: Vec<NodeId> = nest_children(tree, owner)?
        .into_iter()
        .filter(|c| tree.node_kind(*c).is_some_and(|k| !policy.ignored_kinds.contains(k)))
        .collect();
    if body.is_empty() {
        return Ok(false);
    }
    for stmt in body {
        let simple = match tree.node_kind(stmt) {
            Some(NodeKind::Assignment) => is_literal_assignment(tree, stmt)?,
            Some(NodeKind::Conditional) if policy.guarded_assignments_are_simple => {
                is_simple_body(tree, stmt, policy)?
            }
            _ => false,
        };
        if !simple {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_literal_assignment<T: NodeTree + ?Sized>(tree: &T, assignment: NodeId) -> AccResult<bool> {
    match tree.children_of(assignment).last() {
        Some(rhs) => family::has_descendant(tree, *rhs, NodeKind::Literal, true),
        None => Ok(false),
    }
}

/// Induction variable of `loop_node`.
pub fn loop_variable_name<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<String> {
    family::expect_kind(tree, loop_node, NodeKind::Loop)?;
    match tree.variable(loop_node) {
        Some(variable) => Ok(variable.to_string()),
        None => Err(TreeError::new(TreeErrorKind::MissingVariable, "Loop has no induction variable.")
            .with_node(loop_node)
            .into()),
    }
}

/// Induction variables of `loop_node` and every loop inside it, outer-most first.
pub fn loop_nest_variable_names<T: NodeTree + ?Sized>(tree: &T, loop_node: NodeId) -> AccResult<Vec<String>> {
    family::expect_kind(tree, loop_node, NodeKind::Loop)?;
    family::descendants(tree, loop_node, &Query::of(NodeKind::Loop).inclusive())?
        .into_iter()
        .map(|l| loop_variable_name(tree, l))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clauses::LoopClauses;
    use crate::directives::RegionOptions;
    use crate::ir::ast::{BinaryOp, Expr, Stmt};
    use crate::ir::Tree;

    fn literal_body() -> Vec<Stmt> {
        vec![Stmt::assign("a", &["i"], Expr::real("0.0"))]
    }

    #[test]
    fn test_outer_loop() {
        let tree = Tree::from_stmts(&Stmt::loop_nest(&["j", "i"], 8, literal_body()));
        let loops = tree.loops();
        assert!(is_outer_loop(&tree, loops[0]).unwrap());
        assert!(!is_outer_loop(&tree, loops[1]).unwrap());
        let assign = tree.nodes_of_kind(NodeKind::Assignment)[0];
        assert!(is_outer_loop(&tree, assign).unwrap_err().is_type_error());
    }

    #[test]
    fn test_depth_count_ignores_sibling_loops() {
        let stmts = vec![Stmt::for_loop(
            "k",
            4,
            vec![
                Stmt::for_loop("j", 4, literal_body()),
                Stmt::for_loop("i", 4, Stmt::loop_nest(&["m"], 4, literal_body())),
            ],
        )];
        let tree = Tree::from_stmts(&stmts);
        let loops = tree.loops();
        assert_eq!(nest_depth_count(&tree, loops[0]).unwrap(), 3);
        assert_eq!(nest_depth_count(&tree, loops[1]).unwrap(), 1);
        assert_eq!(nest_depth_count(&tree, loops[2]).unwrap(), 2);
    }

    #[test]
    fn test_imperfect_outer_level() {
        // k { j { i { a = 0 } } ; s = 1 }
        let mut body = Stmt::loop_nest(&["j", "i"], 4, literal_body());
        body.push(Stmt::assign_scalar("s", Expr::int(1)));
        let tree = Tree::from_stmts(&[Stmt::for_loop("k", 4, body)]);
        let loops = tree.loops();
        assert!(!is_perfectly_nested(&tree, loops[0]).unwrap());
        assert!(is_perfectly_nested(&tree, loops[1]).unwrap());
        assert!(is_simple_loop(&tree, loops[1]).unwrap());
    }

    #[test]
    fn test_not_outer_most() {
        // k { j { i { a = 0 } ; s = 1 } }
        let mut inner = vec![Stmt::for_loop("i", 4, literal_body())];
        inner.push(Stmt::assign_scalar("s", Expr::int(1)));
        let tree = Tree::from_stmts(&Stmt::loop_nest(&["k", "j"], 4, inner));
        let loops = tree.loops();
        assert!(!is_perfectly_nested(&tree, loops[0]).unwrap());
        let err = is_perfectly_nested(&tree, loops[1]).unwrap_err();
        assert_eq!(err.value_kind(), Some(ValueErrorKind::NotOuterMost));
        assert!(is_perfectly_nested(&tree, loops[2]).unwrap());
        assert_eq!(perfect_nest_depth(&tree, loops[0]).unwrap(), 2);
        assert_eq!(perfect_nest_depth(&tree, loops[1]).unwrap(), 1);
    }

    #[test]
    fn test_conditional_breaks_simplicity_by_default() {
        let guarded = vec![Stmt::if_then(
            Expr::binary(BinaryOp::Gt, Expr::var("i"), Expr::int(1)),
            literal_body(),
        )];
        let tree = Tree::from_stmts(&[Stmt::for_loop("i", 4, guarded)]);
        let outer = tree.loops()[0];
        assert!(is_perfectly_nested(&tree, outer).unwrap());
        assert!(!is_simple_loop(&tree, outer).unwrap());
        let lenient = NestPolicy::default().with_guarded_assignments(true);
        assert!(is_simple_loop_with(&tree, outer, &lenient).unwrap());
    }

    #[test]
    fn test_non_literal_rhs_is_not_simple() {
        let body = vec![Stmt::assign("a", &["i"], Expr::array("b", vec![Expr::var("i")]))];
        let tree = Tree::from_stmts(&[Stmt::for_loop("i", 4, body)]);
        let outer = tree.loops()[0];
        assert!(is_perfectly_nested(&tree, outer).unwrap());
        assert!(!is_simple_loop(&tree, outer).unwrap());

        let empty = Tree::from_stmts(&[Stmt::for_loop("i", 4, vec![])]);
        assert!(!is_simple_loop(&empty, empty.loops()[0]).unwrap());
    }

    #[test]
    fn test_variable_names() {
        let tree = Tree::from_stmts(&Stmt::loop_nest(&["k", "j", "i"], 4, literal_body()));
        let outer = tree.loops()[0];
        assert_eq!(loop_variable_name(&tree, outer).unwrap(), "k");
        assert_eq!(loop_nest_variable_names(&tree, outer).unwrap(), vec!["k", "j", "i"]);
    }

    #[test]
    fn test_inner_loop_of_clean_nest_is_not_outer_most() {
        let tree = Tree::from_stmts(&Stmt::loop_nest(&["j", "i"], 8, literal_body()));
        let inner = tree.loops()[1];
        let perfect = is_perfectly_nested(&tree, inner).unwrap_err();
        let simple = is_simple_loop(&tree, inner).unwrap_err();
        assert_eq!(perfect.value_kind(), Some(ValueErrorKind::NotOuterMost));
        assert_eq!(simple.value_kind(), Some(ValueErrorKind::NotOuterMost));
        assert_eq!(perfect.to_string(), simple.to_string());
        assert_eq!(perfect_nest_depth(&tree, inner).unwrap(), 1);
    }

    #[test]
    fn test_ignored_kinds_change_perfection() {
        // k { j { a = 0 } ; x = 1 }
        let body = vec![
            Stmt::for_loop("j", 4, literal_body()),
            Stmt::assign_scalar("x", Expr::int(1)),
        ];
        let tree = Tree::from_stmts(&[Stmt::for_loop("k", 4, body)]);
        let outer = tree.loops()[0];
        assert!(!is_perfectly_nested(&tree, outer).unwrap());
        assert_eq!(perfect_nest_depth(&tree, outer).unwrap(), 1);

        let lenient = NestPolicy::default()
            .with_ignored_kinds(NodeKind::Literal | NodeKind::Reference | NodeKind::Assignment);
        assert!(is_perfectly_nested_with(&tree, outer, &lenient).unwrap());
        assert_eq!(perfect_nest_depth_with(&tree, outer, &lenient).unwrap(), 2);
    }

    /// A tree whose owner does not report induction variables.
    struct Anonymous(Tree);

    impl NodeTree for Anonymous {
        fn root(&self) -> NodeId {
            self.0.root()
        }
        fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
            self.0.node_kind(node)
        }
        fn parent_of(&self, node: NodeId) -> Option<NodeId> {
            self.0.parent_of(node)
        }
        fn children_of(&self, node: NodeId) -> &[NodeId] {
            self.0.children_of(node)
        }
        fn variable(&self, _node: NodeId) -> Option<&str> {
            None
        }
        fn clauses(&self, marker: NodeId) -> Option<&LoopClauses> {
            self.0.clauses(marker)
        }
        fn clauses_mut(&mut self, marker: NodeId) -> Option<&mut LoopClauses> {
            self.0.clauses_mut(marker)
        }
        fn wrap_in_region(&mut self, targets: &[NodeId], options: &RegionOptions) -> Result<NodeId, TreeError> {
            self.0.wrap_in_region(targets, options)
        }
        fn wrap_in_loop_marker(&mut self, target: NodeId) -> Result<NodeId, TreeError> {
            self.0.wrap_in_loop_marker(target)
        }
    }

    #[test]
    fn test_missing_variable_is_tree_error() {
        let tree = Anonymous(Tree::from_stmts(&Stmt::loop_nest(&["j", "i"], 4, literal_body())));
        let outer = tree.0.loops()[0];
        let err = loop_variable_name(&tree, outer).unwrap_err();
        assert_eq!(err.tree_kind(), Some(TreeErrorKind::MissingVariable));
        assert!(loop_nest_variable_names(&tree, outer).is_err());
    }
}
