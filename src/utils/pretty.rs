//! Outline rendering of a tree for logs and tests.
//!
//! Only the logical structure is shown: statement lists are flattened into
//! their owner, and loop markers list their clauses.
//!
//! ```text
//! Other
//!   RegionMarker
//!     LoopMarker[gang vector]
//!       Loop[j]
//!         Assignment
//! ```

use crate::family;
use crate::ir::{KindSet, NodeId, NodeKind, NodeTree};
use pretty::{BoxAllocator, DocAllocator, DocBuilder};
use std::fmt;

/// Default line width for pretty printing.
pub const DEFAULT_WIDTH: usize = 80;

/// Indentation per nesting level.
const INDENT: isize = 2;

/// A displayable outline of the sub-tree rooted at a node.
pub struct TreeDump<'t, T: NodeTree + ?Sized> {
    tree: &'t T,
    node: NodeId,
    width: usize,
}

impl<'t, T: NodeTree + ?Sized> TreeDump<'t, T> {
    /// Render with a different line width.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

/// Outline of `node` and everything below it.
pub fn dump_tree<T: NodeTree + ?Sized>(tree: &T, node: NodeId) -> TreeDump<'_, T> {
    TreeDump {
        tree,
        node,
        width: DEFAULT_WIDTH,
    }
}

fn label<T: NodeTree + ?Sized>(tree: &T, node: NodeId) -> String {
    match tree.node_kind(node) {
        Some(NodeKind::Loop) => format!("Loop[{}]", tree.variable(node).unwrap_or("?")),
        Some(NodeKind::LoopMarker) => match tree.clauses(node).map(|c| c.to_string()) {
            Some(clauses) if !clauses.is_empty() => format!("LoopMarker[{}]", clauses),
            _ => "LoopMarker".to_string(),
        },
        Some(kind) => kind.to_string(),
        None => format!("<unknown {}>", node),
    }
}

fn node_doc<'a, T: NodeTree + ?Sized>(
    allocator: &'a BoxAllocator,
    tree: &T,
    node: NodeId,
) -> DocBuilder<'a, BoxAllocator> {
    let head = allocator.text(label(tree, node));
    let children = family::children(tree, node, KindSet::ANY, KindSet::NONE).unwrap_or_default();
    if children.is_empty() {
        return head;
    }
    let body = allocator.intersperse(
        children.into_iter().map(|c| node_doc(allocator, tree, c)),
        allocator.hardline(),
    );
    head.append(allocator.hardline().append(body).nest(INDENT))
}

impl<'t, T: NodeTree + ?Sized> fmt::Display for TreeDump<'t, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let allocator = BoxAllocator;
        let doc = node_doc(&allocator, self.tree, self.node).into_doc();
        doc.render_fmt(self.width, f)
    }
}
