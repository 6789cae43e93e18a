//! Canned annotation passes built from the core queries and mutators.
//!
//! These are what a driver typically runs once per routine: offload every
//! outer loop, give each loop a marker, then pick a parallelisation strategy
//! per loop.

use crate::analysis::{is_outer_loop, is_parallelisable, perfect_nest_depth_with, DependencyOracle, NestPolicy};
use crate::clauses::{
    apply_loop_collapse, apply_loop_gang, apply_loop_seq, apply_loop_vector, ensure_loop_marker,
    has_collapse_clause, loop_clauses, LoopClauses,
};
use crate::directives::{apply_region_marker, has_loop_marker, has_region_marker, RegionOptions};
use crate::family::{self, Query};
use crate::ir::{NodeId, NodeKind, NodeTree};
use crate::utils::pretty::dump_tree;
use crate::AnnotationConfig;
use anyhow::{Context, Result};
use log::{debug, info, trace};
use serde::Serialize;
use std::fmt;

/// What a pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationReport {
    /// Region markers created
    pub regions: usize,
    /// Loop markers created
    pub loop_markers: usize,
    /// Loops given `gang` and `vector`
    pub gang_vector: usize,
    /// Loops given `seq`
    pub seq: usize,
    /// Nests given a `collapse` clause
    pub collapsed: usize,
    /// Loops the dependency oracle refused to parallelise
    pub rejected: Vec<NodeId>,
}

impl fmt::Display for AnnotationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} region(s), {} loop marker(s), {} gang/vector, {} seq, {} collapsed, {} rejected",
            self.regions,
            self.loop_markers,
            self.gang_vector,
            self.seq,
            self.collapsed,
            self.rejected.len()
        )
    }
}

fn all_loops<T: NodeTree + ?Sized>(tree: &T) -> Result<Vec<NodeId>> {
    Ok(family::descendants(tree, tree.root(), &Query::of(NodeKind::Loop))?)
}

fn loops_in_regions<T: NodeTree + ?Sized>(tree: &T) -> Result<Vec<NodeId>> {
    let mut found = Vec::new();
    for lp in all_loops(tree)? {
        if has_region_marker(tree, lp)? {
            found.push(lp);
        }
    }
    Ok(found)
}

/// Wrap every outer-most loop not yet in a region in its own region marker.
pub fn mark_outer_loops<T: NodeTree + ?Sized>(tree: &mut T, options: &RegionOptions) -> Result<Vec<NodeId>> {
    let mut markers = Vec::new();
    for lp in all_loops(tree)? {
        if !is_outer_loop(tree, lp)? || has_region_marker(tree, lp)? {
            continue;
        }
        let marker = apply_region_marker(tree, &[lp], options)
            .with_context(|| format!("failed to mark outer loop {}", lp))?;
        markers.push(marker);
    }
    info!("marked {} outer loop(s) as regions", markers.len());
    Ok(markers)
}

/// Give every loop inside a region a loop marker. Returns how many were new.
pub fn mark_loops<T: NodeTree + ?Sized>(tree: &mut T) -> Result<usize> {
    let mut created = 0;
    for lp in loops_in_regions(tree)? {
        if !has_loop_marker(tree, lp)? {
            ensure_loop_marker(tree, lp).with_context(|| format!("failed to mark loop {}", lp))?;
            created += 1;
        }
    }
    info!("created {} loop marker(s)", created);
    Ok(created)
}

/// `gang` + `vector` on outer-most loops, `seq` on the rest.
pub fn insert_default_clauses<T: NodeTree + ?Sized>(tree: &mut T) -> Result<AnnotationReport> {
    let mut report = AnnotationReport::default();
    insert_clauses(tree, true, true, None, &mut report)?;
    Ok(report)
}

/// Loops whose clauses come from an enclosing collapse.
fn collapsed_from_above<T: NodeTree + ?Sized>(tree: &T, lp: NodeId) -> Result<bool> {
    let own = loop_clauses(tree, lp)?.and_then(LoopClauses::collapse);
    Ok(own.is_none() && has_collapse_clause(tree, lp)?)
}

fn insert_clauses<T: NodeTree + ?Sized>(
    tree: &mut T,
    gang_vector_outer: bool,
    seq_inner: bool,
    oracle: Option<&dyn DependencyOracle<T>>,
    report: &mut AnnotationReport,
) -> Result<()> {
    for lp in loops_in_regions(tree)? {
        if collapsed_from_above(tree, lp)? {
            debug!("loop {} is covered by an enclosing collapse", lp);
            continue;
        }
        let outer = is_outer_loop(tree, lp)?;
        if outer && gang_vector_outer {
            let allowed = match oracle {
                Some(oracle) => is_parallelisable(tree, lp, oracle)
                    .with_context(|| format!("dependency analysis failed for loop {}", lp))?,
                None => true,
            };
            if allowed {
                apply_loop_gang(tree, lp).with_context(|| format!("failed to apply gang to loop {}", lp))?;
                apply_loop_vector(tree, lp).with_context(|| format!("failed to apply vector to loop {}", lp))?;
                report.gang_vector += 1;
                continue;
            }
            report.rejected.push(lp);
            apply_loop_seq(tree, lp).with_context(|| format!("failed to apply seq to loop {}", lp))?;
            report.seq += 1;
        } else if !outer && seq_inner {
            apply_loop_seq(tree, lp).with_context(|| format!("failed to apply seq to loop {}", lp))?;
            report.seq += 1;
        }
    }
    Ok(())
}

/// Collapse the leading perfectly nested levels of every outer-most loop in a
/// region. Nests with fewer than two such levels are left alone.
pub fn collapse_perfect_nests<T: NodeTree + ?Sized>(tree: &mut T, policy: &NestPolicy) -> Result<usize> {
    let mut collapsed = 0;
    for lp in loops_in_regions(tree)? {
        if !is_outer_loop(tree, lp)? {
            continue;
        }
        let depth = perfect_nest_depth_with(tree, lp, policy)?;
        if depth < 2 {
            debug!("loop {} has no perfect sub-nest to collapse", lp);
            continue;
        }
        apply_loop_collapse(tree, lp, depth).with_context(|| format!("failed to collapse loop {}", lp))?;
        collapsed += 1;
    }
    info!("collapsed {} nest(s)", collapsed);
    Ok(collapsed)
}

/// Run the passes selected by `config`.
///
/// With an `oracle`, outer loops it refuses get `seq` instead of
/// `gang`/`vector` and are listed in the report.
pub fn annotate<T: NodeTree + ?Sized>(
    tree: &mut T,
    config: &AnnotationConfig,
    oracle: Option<&dyn DependencyOracle<T>>,
) -> Result<AnnotationReport> {
    let mut report = AnnotationReport::default();
    let markers_before = count_loop_markers(tree)?;
    if config.mark_regions {
        report.regions = mark_outer_loops(tree, &config.region_options)?.len();
    }
    if config.collapse_perfect_nests {
        report.collapsed = collapse_perfect_nests(tree, &config.nest_policy)?;
    }
    if config.mark_all_loops {
        mark_loops(tree)?;
    }
    insert_clauses(tree, config.gang_vector_outer, config.seq_inner, oracle, &mut report)?;
    report.loop_markers = count_loop_markers(tree)? - markers_before;
    info!("annotation complete: {}", report);
    trace!("annotated tree:\n{}", dump_tree(&*tree, tree.root()));
    Ok(report)
}

fn count_loop_markers<T: NodeTree + ?Sized>(tree: &T) -> Result<usize> {
    Ok(family::descendants(tree, tree.root(), &Query::of(NodeKind::LoopMarker))?.len())
}
