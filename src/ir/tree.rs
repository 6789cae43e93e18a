//! The node capability interface consumed by every query and mutation.
//!
//! The tree itself is owned by the caller; this crate only reads node
//! attributes through [`NodeTree`], edits clause records on loop markers, and
//! asks the owner to wrap nodes in new markers.

use crate::clauses::LoopClauses;
use crate::directives::RegionOptions;
use crate::ir::{NodeId, NodeKind};
use crate::utils::errors::TreeError;

/// Read access to an externally owned tree plus mutation-by-request.
///
/// Raw parent/child links are exposed as-is, including the IR's book-keeping
/// `Schedule` layer. Logical navigation lives in [`crate::family`].
///
/// Conventions implementors must follow:
/// - an Assignment's right-hand side is its last raw child;
/// - a marker created by `wrap_in_region`/`wrap_in_loop_marker` holds a single
///   `Schedule` child, which holds the wrapped nodes in their original order.
pub trait NodeTree {
    /// The root node.
    fn root(&self) -> NodeId;

    /// The kind of `node`, or `None` if the handle is not part of this tree.
    fn node_kind(&self, node: NodeId) -> Option<NodeKind>;

    /// The raw parent of `node`.
    fn parent_of(&self, node: NodeId) -> Option<NodeId>;

    /// The raw children of `node`, in source order.
    fn children_of(&self, node: NodeId) -> &[NodeId];

    /// The induction variable of a Loop node.
    fn variable(&self, node: NodeId) -> Option<&str>;

    /// The clause record of a LoopMarker node.
    fn clauses(&self, marker: NodeId) -> Option<&LoopClauses>;

    /// Mutable clause record of a LoopMarker node.
    fn clauses_mut(&mut self, marker: NodeId) -> Option<&mut LoopClauses>;

    /// Wrap consecutive sibling `targets` in a new RegionMarker.
    fn wrap_in_region(&mut self, targets: &[NodeId], options: &RegionOptions) -> Result<NodeId, TreeError>;

    /// Wrap `target` in a new LoopMarker with a default clause record.
    fn wrap_in_loop_marker(&mut self, target: NodeId) -> Result<NodeId, TreeError>;

    /// Check whether `node` belongs to this tree.
    fn contains(&self, node: NodeId) -> bool {
        self.node_kind(node).is_some()
    }

    /// Distance from the root in raw levels.
    fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent_of(node);
        while let Some(p) = current {
            depth += 1;
            current = self.parent_of(p);
        }
        depth
    }

    /// Ordinal of `node` among its raw siblings (0 at the root).
    fn position(&self, node: NodeId) -> usize {
        self.parent_of(node)
            .and_then(|p| self.children_of(p).iter().position(|c| *c == node))
            .unwrap_or(0)
    }

    /// `node` and all of its descendants in pre-order.
    fn walk(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children_of(current).iter().rev().copied());
        }
        out
    }

    /// Every node after `node` in a pre-order walk of the whole tree.
    fn following(&self, node: NodeId) -> Vec<NodeId> {
        let all = self.walk(self.root());
        match all.iter().position(|n| *n == node) {
            Some(idx) => all[idx + 1..].to_vec(),
            None => Vec::new(),
        }
    }
}
