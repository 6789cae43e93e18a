//! Loop parallelisability through a dependency oracle.
//!
//! The engine does not analyse dependences itself. Callers plug in a
//! [`DependencyOracle`]; [`SubscriptOracle`] is a conservative syntactic one
//! for the arena [`Tree`]:
//! - every array written in the body is indexed by the loop variable
//! - no scalar is written
//! - every access to a written array uses exactly the written subscripts
//! - no call statement appears in the body

use crate::family;
use crate::ir::{NodeId, NodeKind, NodeTree, Tree};
use crate::utils::errors::{AccError, AccResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Decides whether a loop's iterations may be reordered.
pub trait DependencyOracle<T: NodeTree + ?Sized> {
    fn can_parallelise(&self, tree: &T, loop_node: NodeId) -> anyhow::Result<bool>;
}

impl<T, F> DependencyOracle<T> for F
where
    T: NodeTree + ?Sized,
    F: Fn(&T, NodeId) -> bool,
{
    fn can_parallelise(&self, tree: &T, loop_node: NodeId) -> anyhow::Result<bool> {
        Ok(self(tree, loop_node))
    }
}

/// Ask `oracle` whether `loop_node` can be parallelised.
///
/// Oracle failures are passed through unchanged as [`AccError::Oracle`].
pub fn is_parallelisable<T, O>(tree: &T, loop_node: NodeId, oracle: &O) -> AccResult<bool>
where
    T: NodeTree + ?Sized,
    O: DependencyOracle<T> + ?Sized,
{
    family::expect_kind(tree, loop_node, NodeKind::Loop)?;
    oracle.can_parallelise(tree, loop_node).map_err(AccError::Oracle)
}

/// Kind of data dependence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependenceKind {
    /// Read-after-write (true/flow dependence)
    Flow,
    /// Write-after-read (anti dependence)
    Anti,
    /// Write-after-write (output dependence)
    Output,
}

impl DependenceKind {
    /// Get short name for the dependence kind.
    pub fn short_name(&self) -> &'static str {
        match self {
            DependenceKind::Flow => "RAW",
            DependenceKind::Anti => "WAR",
            DependenceKind::Output => "WAW",
        }
    }
}

/// A reason the loop's iterations may not be reordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Variable involved
    pub variable: String,
    /// Kind of dependence assumed
    pub kind: DependenceKind,
    /// Node that triggered the conflict
    pub node: NodeId,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on '{}' at {}", self.kind.short_name(), self.variable, self.node)
    }
}

/// An array or scalar access inside a loop body.
#[derive(Debug, Clone)]
struct Access {
    node: NodeId,
    name: String,
    subscripts: Vec<String>,
    write: bool,
}

/// Conservative syntactic dependency test over [`Tree`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptOracle;

impl SubscriptOracle {
    pub fn new() -> Self {
        SubscriptOracle
    }

    /// All conflicts preventing `loop_node` from being parallelised.
    pub fn conflicts(&self, tree: &Tree, loop_node: NodeId) -> AccResult<Vec<Conflict>> {
        family::expect_kind(tree, loop_node, NodeKind::Loop)?;
        let variable = tree.variable(loop_node).unwrap_or_default();
        let body: Vec<NodeId> = tree
            .children_of(loop_node)
            .iter()
            .filter(|c| tree.node_kind(**c) == Some(NodeKind::Schedule))
            .flat_map(|s| tree.walk(*s))
            .collect();

        let mut conflicts = Vec::new();
        let mut accesses = Vec::new();
        for node in body {
            match tree.node_kind(node) {
                Some(NodeKind::Reference) => {
                    if let Some(access) = self.access(tree, node) {
                        accesses.push(access);
                    }
                }
                Some(NodeKind::Other) if Self::is_statement(tree, node) => {
                    conflicts.push(Conflict {
                        variable: tree.expr_text(node),
                        kind: DependenceKind::Output,
                        node,
                    });
                }
                _ => {}
            }
        }

        let mut written: BTreeMap<&str, &Access> = BTreeMap::new();
        for write in accesses.iter().filter(|a| a.write) {
            if write.subscripts.is_empty() || !Self::indexed_by(tree, write.node, variable) {
                conflicts.push(Conflict {
                    variable: write.name.clone(),
                    kind: DependenceKind::Output,
                    node: write.node,
                });
            }
            match written.get(write.name.as_str()) {
                Some(first) if first.subscripts != write.subscripts => conflicts.push(Conflict {
                    variable: write.name.clone(),
                    kind: DependenceKind::Output,
                    node: write.node,
                }),
                Some(_) => {}
                None => {
                    written.insert(&write.name, write);
                }
            }
        }
        for read in accesses.iter().filter(|a| !a.write) {
            if let Some(write) = written.get(read.name.as_str()) {
                if write.subscripts != read.subscripts {
                    let kind = if write.node < read.node {
                        DependenceKind::Flow
                    } else {
                        DependenceKind::Anti
                    };
                    conflicts.push(Conflict {
                        variable: read.name.clone(),
                        kind,
                        node: read.node,
                    });
                }
            }
        }

        for conflict in &conflicts {
            debug!("loop '{}' {}: {}", variable, loop_node, conflict);
        }
        Ok(conflicts)
    }

    fn access(&self, tree: &Tree, node: NodeId) -> Option<Access> {
        let name = tree.name(node)?.to_string();
        let parent = tree.parent_of(node)?;
        let write = tree.node_kind(parent) == Some(NodeKind::Assignment)
            && tree.children_of(parent).first() == Some(&node);
        Some(Access {
            node,
            name,
            subscripts: tree.children_of(node).iter().map(|s| tree.expr_text(*s)).collect(),
            write,
        })
    }

    /// Call statements sit directly in a statement list.
    fn is_statement(tree: &Tree, node: NodeId) -> bool {
        tree.parent_of(node)
            .is_some_and(|p| tree.node_kind(p) == Some(NodeKind::Schedule))
    }

    fn indexed_by(tree: &Tree, reference: NodeId, variable: &str) -> bool {
        tree.walk(reference)
            .into_iter()
            .skip(1)
            .any(|n| tree.name(n) == Some(variable) && tree.children_of(n).is_empty())
    }
}

impl DependencyOracle<Tree> for SubscriptOracle {
    fn can_parallelise(&self, tree: &Tree, loop_node: NodeId) -> anyhow::Result<bool> {
        Ok(self.conflicts(tree, loop_node)?.is_empty())
    }
}
