//! Error types for the loop-nest annotation engine.
//!
//! Errors are grouped the way callers need to react to them:
//! wrong node kinds ([`KindError`]), well-typed but semantically invalid
//! requests ([`ValueError`]), failures reported by the tree owner while
//! applying a mutation ([`TreeError`]), and whatever the dependency oracle
//! reports.

use crate::ir::{NodeId, NodeKind};
use std::fmt;
use thiserror::Error;

/// Top-level error type for the engine.
#[derive(Error, Debug)]
pub enum AccError {
    /// A node of the wrong kind was supplied
    #[error("Type error: {0}")]
    Type(#[from] KindError),

    /// A structurally valid but semantically invalid request
    #[error("Value error: {0}")]
    Value(#[from] ValueError),

    /// The tree owner refused a mutation or does not know a node
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    /// The dependency oracle failed
    #[error("Dependency analysis error: {0}")]
    Oracle(#[source] anyhow::Error),
}

impl AccError {
    /// Check whether this is a node-kind error.
    pub fn is_type_error(&self) -> bool {
        matches!(self, AccError::Type(_))
    }

    /// Check whether this is a value error.
    pub fn is_value_error(&self) -> bool {
        matches!(self, AccError::Value(_))
    }

    /// The tree error kind, if this is a tree error.
    pub fn tree_kind(&self) -> Option<TreeErrorKind> {
        match self {
            AccError::Tree(e) => Some(e.kind),
            _ => None,
        }
    }

    /// The value error kind, if this is a value error.
    pub fn value_kind(&self) -> Option<ValueErrorKind> {
        match self {
            AccError::Value(e) => Some(e.kind),
            _ => None,
        }
    }
}

/// A node of an unexpected kind was passed where a specific kind is required.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct KindError {
    /// The kind the operation requires
    pub expected: NodeKind,
    /// The kind that was supplied
    pub found: NodeKind,
}

impl KindError {
    pub fn new(expected: NodeKind, found: NodeKind) -> Self {
        Self { expected, found }
    }
}

impl fmt::Display for KindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expected a {}, not '{}'.", self.expected, self.found)
    }
}

/// A well-typed request that violates a structural or protocol rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    /// The error message
    pub message: String,
    /// The kind of value error
    pub kind: ValueErrorKind,
}

impl ValueError {
    pub fn new(kind: ValueErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueErrorKind {
    /// Loop marker or clause requested outside any region marker
    MissingRegionMarker,
    /// `seq` combined with `gang` or `vector`
    ClauseConflict,
    /// Collapse depth of one or less
    CollapseTooSmall,
    /// Collapse depth exceeding the loops available in the sub-nest
    CollapseTooLarge,
    /// Nest query applied below the outer-most loop of a nest
    NotOuterMost,
    /// Strict grouping given nodes at different depths
    MixedDepth,
    /// Nodes expected to share a parent do not
    NotSiblings,
    /// Nodes expected to be consecutive are not
    NotContiguous,
    /// Marker requested where one already exists
    AlreadyMarked,
    /// Empty block of nodes
    EmptyBlock,
    /// The dependency oracle refused to parallelise the loop
    ParallelismRejected,
}

/// An error reported by the tree owner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct TreeError {
    /// The error message
    pub message: String,
    /// The offending node (if any)
    pub node: Option<NodeId>,
    /// The kind of tree error
    pub kind: TreeErrorKind,
}

impl TreeError {
    pub fn new(kind: TreeErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            node: None,
            kind,
        }
    }

    /// Attach the offending node.
    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Error for a node handle the tree does not own.
    pub fn unknown(node: NodeId) -> Self {
        Self::new(TreeErrorKind::UnknownNode, format!("Unknown node {}.", node)).with_node(node)
    }
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeErrorKind {
    /// The node handle does not belong to this tree
    UnknownNode,
    /// Wrap targets do not share a parent
    NotSiblings,
    /// Wrap targets are not consecutive
    NotContiguous,
    /// The root cannot be wrapped
    RootNotWrappable,
    /// Only statements sitting in a statement list can be wrapped
    NotStatement,
    /// A Loop node reports no induction variable
    MissingVariable,
}

/// Result type using AccError.
pub type AccResult<T> = Result<T, AccError>;

/// Shorthand for building a value error result.
pub(crate) fn value_error<T>(kind: ValueErrorKind, message: impl Into<String>) -> AccResult<T> {
    Err(ValueError::new(kind, message).into())
}
