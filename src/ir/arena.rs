//! Arena-backed implementation of [`NodeTree`].
//!
//! The layout follows the compiler IR the engine was designed against:
//!
//! ```text
//! Routine
//!   Schedule
//!     Loop j            children: [start, stop, step, Schedule]
//!       Literal 1
//!       Literal 10
//!       Literal 1
//!       Schedule
//!         Assignment    children: [lhs, rhs]
//! ```
//!
//! Markers are inserted as `marker -> Schedule -> wrapped nodes`. Nodes are
//! never removed; handles stay valid for the life of the tree.

use crate::clauses::LoopClauses;
use crate::directives::RegionOptions;
use crate::ir::ast::Stmt;
use crate::ir::lower;
use crate::ir::{NodeId, NodeKind, NodeTree};
use crate::utils::errors::{TreeError, TreeErrorKind};
use crate::utils::intern::{Symbol, SymbolInterner};
use log::debug;

/// Kind-specific data carried by a node.
#[derive(Debug, Clone)]
pub(crate) enum Payload {
    Empty,
    Routine,
    Variable(Symbol),
    Name(Symbol),
    Literal(String),
    Operator(String),
    Call(Symbol),
    Region(RegionOptions),
    Clauses(LoopClauses),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    payload: Payload,
}

/// A routine body held in an arena.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
    symbols: SymbolInterner,
}

impl Tree {
    /// Create an empty routine.
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            symbols: SymbolInterner::new(),
        };
        let root = tree.alloc(NodeKind::Other, None, Payload::Routine);
        tree.add_child(root, NodeKind::Schedule, Payload::Empty);
        tree
    }

    /// Build a routine from a statement description.
    pub fn from_stmts(stmts: &[Stmt]) -> Self {
        let mut tree = Tree::new();
        let body = tree.body();
        lower::lower_block(&mut tree, body, stmts);
        tree
    }

    /// The Schedule holding the routine's top-level statements.
    pub fn body(&self) -> NodeId {
        self.nodes[0].children[0]
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes of `kind`, in pre-order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.walk(self.root())
            .into_iter()
            .filter(|n| self.nodes[n.index()].kind == kind)
            .collect()
    }

    /// All loops, in pre-order (outer-most first within a nest).
    pub fn loops(&self) -> Vec<NodeId> {
        self.nodes_of_kind(NodeKind::Loop)
    }

    /// The name carried by a Reference node.
    pub fn name(&self, node: NodeId) -> Option<&str> {
        match &self.get(node)?.payload {
            Payload::Name(sym) => self.symbols.resolve(*sym),
            _ => None,
        }
    }

    /// The options a RegionMarker was created with.
    pub fn region_options(&self, marker: NodeId) -> Option<&RegionOptions> {
        match &self.get(marker)?.payload {
            Payload::Region(options) => Some(options),
            _ => None,
        }
    }

    /// Render an expression subtree as text.
    pub fn expr_text(&self, node: NodeId) -> String {
        let Some(data) = self.get(node) else {
            return String::new();
        };
        let args = |tree: &Tree| {
            data.children
                .iter()
                .map(|c| tree.expr_text(*c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        match &data.payload {
            Payload::Literal(text) => text.clone(),
            Payload::Name(sym) => {
                let name = self.symbols.resolve(*sym).unwrap_or("?");
                if data.children.is_empty() {
                    name.to_string()
                } else {
                    format!("{}({})", name, args(self))
                }
            }
            Payload::Operator(op) => match data.children.as_slice() {
                [operand] => format!("{}{}", op, self.expr_text(*operand)),
                [left, right] => format!("{} {} {}", self.expr_text(*left), op, self.expr_text(*right)),
                _ => op.clone(),
            },
            Payload::Call(sym) => {
                format!("{}({})", self.symbols.resolve(*sym).unwrap_or("?"), args(self))
            }
            _ => data.kind.to_string(),
        }
    }

    pub(crate) fn intern(&mut self, s: &str) -> Symbol {
        self.symbols.intern(s)
    }

    pub(crate) fn add_child(&mut self, parent: NodeId, kind: NodeKind, payload: Payload) -> NodeId {
        let id = self.alloc(kind, Some(parent), payload);
        self.nodes[parent.index()].children.push(id);
        id
    }

    fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>, payload: Payload) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent,
            children: Vec::new(),
            payload,
        });
        id
    }

    fn get(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.index())
    }

    /// Replace consecutive siblings `targets` by `marker -> Schedule -> targets`.
    fn wrap(&mut self, targets: &[NodeId], kind: NodeKind, payload: Payload) -> Result<NodeId, TreeError> {
        let first = *targets.first().ok_or_else(|| {
            TreeError::new(TreeErrorKind::NotContiguous, "Nothing to wrap.")
        })?;
        for target in targets {
            if !self.contains(*target) {
                return Err(TreeError::unknown(*target));
            }
        }
        let parent = self.nodes[first.index()].parent.ok_or_else(|| {
            TreeError::new(TreeErrorKind::RootNotWrappable, "Cannot wrap the root.").with_node(first)
        })?;
        if self.nodes[parent.index()].kind != NodeKind::Schedule {
            return Err(TreeError::new(
                TreeErrorKind::NotStatement,
                "Only statements held in a statement list can be wrapped.",
            )
            .with_node(first));
        }
        if let Some(stray) = targets.iter().find(|t| self.nodes[t.index()].parent != Some(parent)) {
            return Err(TreeError::new(TreeErrorKind::NotSiblings, "Nodes to wrap must share a parent.")
                .with_node(*stray));
        }

        let mut positions: Vec<usize> = targets.iter().map(|t| self.position(*t)).collect();
        positions.sort_unstable();
        if positions.windows(2).any(|w| w[1] != w[0] + 1) {
            return Err(TreeError::new(TreeErrorKind::NotContiguous, "Nodes to wrap must be consecutive.")
                .with_node(first));
        }
        let start = positions[0];
        let end = start + positions.len();

        let marker = self.alloc(kind, Some(parent), payload);
        let schedule = self.add_child(marker, NodeKind::Schedule, Payload::Empty);
        let wrapped: Vec<NodeId> = self.nodes[parent.index()]
            .children
            .splice(start..end, std::iter::once(marker))
            .collect();
        for node in &wrapped {
            self.nodes[node.index()].parent = Some(schedule);
        }
        self.nodes[schedule.index()].children = wrapped;
        debug!("wrapped {} node(s) under {} {}", end - start, kind, marker);
        Ok(marker)
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

impl NodeTree for Tree {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.get(node).map(|d| d.kind)
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.parent
    }

    fn children_of(&self, node: NodeId) -> &[NodeId] {
        self.get(node).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    fn variable(&self, node: NodeId) -> Option<&str> {
        match &self.get(node)?.payload {
            Payload::Variable(sym) => self.symbols.resolve(*sym),
            _ => None,
        }
    }

    fn clauses(&self, marker: NodeId) -> Option<&LoopClauses> {
        match &self.get(marker)?.payload {
            Payload::Clauses(clauses) => Some(clauses),
            _ => None,
        }
    }

    fn clauses_mut(&mut self, marker: NodeId) -> Option<&mut LoopClauses> {
        match &mut self.nodes.get_mut(marker.index())?.payload {
            Payload::Clauses(clauses) => Some(clauses),
            _ => None,
        }
    }

    fn wrap_in_region(&mut self, targets: &[NodeId], options: &RegionOptions) -> Result<NodeId, TreeError> {
        self.wrap(targets, NodeKind::RegionMarker, Payload::Region(options.clone()))
    }

    fn wrap_in_loop_marker(&mut self, target: NodeId) -> Result<NodeId, TreeError> {
        self.wrap(&[target], NodeKind::LoopMarker, Payload::Clauses(LoopClauses::default()))
    }
}
