//! Node handles, kinds and kind filters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// A handle to a node owned by a [`NodeTree`](crate::ir::NodeTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kinds of node the engine distinguishes.
///
/// `Schedule` is the IR's book-keeping layer that holds every statement list,
/// which is why logical children sit two raw levels below their parent.
/// `Kernel` is a transparent wrapper around a statement list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Loop,
    Assignment,
    Reference,
    Literal,
    Conditional,
    RegionMarker,
    LoopMarker,
    Kernel,
    Schedule,
    Other,
}

impl NodeKind {
    /// All kinds, in declaration order.
    pub const ALL: [NodeKind; 10] = [
        NodeKind::Loop,
        NodeKind::Assignment,
        NodeKind::Reference,
        NodeKind::Literal,
        NodeKind::Conditional,
        NodeKind::RegionMarker,
        NodeKind::LoopMarker,
        NodeKind::Kernel,
        NodeKind::Schedule,
        NodeKind::Other,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Check whether this kind is one of the two directive markers.
    pub fn is_marker(self) -> bool {
        matches!(self, NodeKind::RegionMarker | NodeKind::LoopMarker)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Loop => "Loop",
            NodeKind::Assignment => "Assignment",
            NodeKind::Reference => "Reference",
            NodeKind::Literal => "Literal",
            NodeKind::Conditional => "Conditional",
            NodeKind::RegionMarker => "RegionMarker",
            NodeKind::LoopMarker => "LoopMarker",
            NodeKind::Kernel => "Kernel",
            NodeKind::Schedule => "Schedule",
            NodeKind::Other => "Other",
        };
        write!(f, "{}", name)
    }
}

/// A set of node kinds, used as a type filter in tree queries.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KindSet(u16);

impl KindSet {
    /// Matches nothing.
    pub const NONE: KindSet = KindSet(0);
    /// Matches every kind.
    pub const ANY: KindSet = KindSet(0x03ff);

    /// A set holding a single kind.
    pub fn of(kind: NodeKind) -> Self {
        KindSet(kind.bit())
    }

    /// This set plus `kind`.
    pub fn with(self, kind: NodeKind) -> Self {
        KindSet(self.0 | kind.bit())
    }

    pub fn contains(self, kind: NodeKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for KindSet {
    fn default() -> Self {
        KindSet::NONE
    }
}

impl From<NodeKind> for KindSet {
    fn from(kind: NodeKind) -> Self {
        KindSet::of(kind)
    }
}

impl BitOr for KindSet {
    type Output = KindSet;
    fn bitor(self, rhs: KindSet) -> KindSet {
        KindSet(self.0 | rhs.0)
    }
}

impl BitOr<NodeKind> for KindSet {
    type Output = KindSet;
    fn bitor(self, rhs: NodeKind) -> KindSet {
        self.with(rhs)
    }
}

impl BitOr for NodeKind {
    type Output = KindSet;
    fn bitor(self, rhs: NodeKind) -> KindSet {
        KindSet::of(self).with(rhs)
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(NodeKind::ALL.iter().filter(|k| self.contains(**k)))
            .finish()
    }
}
