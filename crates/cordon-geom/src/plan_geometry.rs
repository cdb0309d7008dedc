//! Derived visualization geometry for a resolved plan.
//!
//! Everything a map client needs to draw the situation: the isochrone
//! polygon through the adversary's estimated present positions, the escape
//! paths sliced by past/future and by cover category, and the escape nodes
//! split into covered and uncovered.

use geo::{LineString, Point, Polygon};
use log::debug;
use rustc_hash::FxHashMap;

use cordon_core::{NodeId, PlannerConfig};
use cordon_graph::{Position, RoadGraph, polyline};
use cordon_model::{CoverStatus, EscapeModel, EscapeTree};

use crate::balance::balanced_polygon;
use crate::error::GeomResult;

// ── PlanGeometry ──────────────────────────────────────────────────────────────

/// Geometry bundle derived from an [`EscapeModel`] whose cover statuses have
/// been resolved (control nodes marked, cover propagated).
#[derive(Debug)]
pub struct PlanGeometry {
    /// Polygon through the adversary's possible present positions.
    pub isochrone: Polygon<f64>,
    /// Path stretches the adversary may already have driven.
    pub past_paths: Vec<LineString<f64>>,
    /// Future stretches no vehicle blocks.
    pub uncontrolled_paths: Vec<LineString<f64>>,
    /// Future stretches leading up to a control node.
    pub before_control_paths: Vec<LineString<f64>>,
    /// Future stretches behind a control node.
    pub after_control_paths: Vec<LineString<f64>>,
    /// Escape nodes the plan blocks, with their coordinates.
    pub covered_escape_nodes: Vec<(NodeId, Point<f64>)>,
    /// Escape nodes still open.
    pub uncovered_escape_nodes: Vec<(NodeId, Point<f64>)>,
}

impl PlanGeometry {
    /// Compute the full geometry bundle for `model`.
    pub fn derive(
        model: &EscapeModel,
        graph: &RoadGraph,
        cfg: &PlannerConfig,
    ) -> GeomResult<Self> {
        let (present, isochrone) = isochrone_with_positions(model, graph, cfg)?;

        let cats = model.tree.categorize_segments();
        let mut past_paths = Vec::new();
        let mut uncontrolled_paths = Vec::new();
        let mut before_control_paths = Vec::new();
        let mut after_control_paths = Vec::new();

        for seg in &cats.uncovered {
            split_past_future(
                model,
                graph,
                &present,
                seg,
                &mut past_paths,
                &mut uncontrolled_paths,
            )?;
        }
        for seg in &cats.before_control {
            split_past_future(
                model,
                graph,
                &present,
                seg,
                &mut past_paths,
                &mut before_control_paths,
            )?;
        }
        for seg in &cats.after_control {
            after_control_paths.push(chain_linestring(graph, model, seg, None, None)?);
        }

        let mut covered_escape_nodes = Vec::new();
        let mut uncovered_escape_nodes = Vec::new();
        for leaf in model.tree.leaves() {
            let node = model.tree.node(leaf);
            if node.osmid.is_root() {
                continue;
            }
            let entry = (node.osmid, graph.node_point(node.osmid)?);
            match node.cover {
                CoverStatus::Covered => covered_escape_nodes.push(entry),
                _ => uncovered_escape_nodes.push(entry),
            }
        }

        debug!(
            "plan geometry: {} past, {} uncontrolled, {} before-control, {} after-control lines",
            past_paths.len(),
            uncontrolled_paths.len(),
            before_control_paths.len(),
            after_control_paths.len()
        );
        Ok(Self {
            isochrone,
            past_paths,
            uncontrolled_paths,
            before_control_paths,
            after_control_paths,
            covered_escape_nodes,
            uncovered_escape_nodes,
        })
    }
}

// ── Isochrone ─────────────────────────────────────────────────────────────────

/// Estimated present position of the adversary on the way to each NJOI,
/// plus the balanced isochrone polygon through all of them.
fn isochrone_with_positions(
    model: &EscapeModel,
    graph: &RoadGraph,
    cfg: &PlannerConfig,
) -> GeomResult<(FxHashMap<NodeId, Position>, Polygon<f64>)> {
    let lk = &model.lk_position;
    let mut present: FxHashMap<NodeId, Position> = FxHashMap::default();
    let mut points: Vec<Point<f64>> = Vec::new();

    for njoi_idx in model.tree.njois() {
        let njoi = model.tree.node(njoi_idx);
        let parent_idx = njoi.parent.expect("the root is never past the isochrone");
        let parent = model.tree.node(parent_idx);

        let pos = if parent.osmid.is_root() {
            // No real edge joins the root to the NJOI: the adversary is
            // still somewhere on the LKP's own edge.  Advance by at least
            // the floor so a very fresh sighting still draws a polygon,
            // capped at the edge's remaining travel time.
            let toward_v = njoi.osmid == lk.v();
            let travel_time = graph.edge_travel_time(lk.u(), lk.v())?;
            let remaining =
                if toward_v { travel_time * (1.0 - lk.ec()) } else { travel_time * lk.ec() };
            let advance = cfg.min_isochrone_time_floor.max(model.time_elapsed).min(remaining);
            graph.advance_position(lk, advance, toward_v)?
        } else {
            // Fraction of the edge already driven when the clock hits zero.
            let span = njoi.time_reached - parent.time_reached;
            let ec = -parent.time_reached / span;
            graph.position(parent.osmid, njoi.osmid, ec)?
        };
        points.push(graph.pos_to_point(&pos)?);
        present.insert(njoi.osmid, pos);
    }

    // Escape nodes already behind the adversary: extrapolate a proxy point
    // past the node along the LKP→node direction and pull it back onto the
    // road network.  Not a present position — nothing intercepts there.
    for leaf in model.tree.leaves() {
        let node = model.tree.node(leaf);
        if node.osmid.is_root() || node.time_reached > 0.0 {
            continue;
        }
        let p0 = graph.pos_to_point(lk)?;
        let p1 = graph.node_point(node.osmid)?;
        let raw_travel = model.times[&node.osmid] + model.time_elapsed;
        let r = if raw_travel > 0.0 { model.time_elapsed / raw_travel } else { 1.0 };
        let proxy =
            Point::new(p0.x() + r * (p1.x() - p0.x()), p0.y() + r * (p1.y() - p0.y()));
        let snapped = graph.snap(proxy, false)?;
        points.push(graph.pos_to_point(&snapped)?);
    }

    let isochrone = balanced_polygon(&points, cfg.balanced_polygon_ratio_threshold);
    Ok((present, isochrone))
}

// ── Segment slicing ───────────────────────────────────────────────────────────

/// Split one categorized segment at the isochrone: everything before the
/// NJOI's present position is past, everything after is future.  Segments
/// not containing an NJOI fall entirely on one side.
fn split_past_future(
    model: &EscapeModel,
    graph: &RoadGraph,
    present: &FxHashMap<NodeId, Position>,
    seg: &[usize],
    past: &mut Vec<LineString<f64>>,
    future: &mut Vec<LineString<f64>>,
) -> GeomResult<()> {
    let njoi_at = seg.iter().position(|&i| model.tree.node(i).is_njoi);

    match njoi_at {
        // The NJOI heads the segment: its incoming edge lives in the parent
        // segment (which splits there); everything here is future.
        Some(0) => future.push(chain_linestring(graph, model, seg, None, None)?),
        Some(idx) => {
            let njoi = model.tree.node(seg[idx]);
            let pos = &present[&njoi.osmid];
            let prev = model.tree.node(seg[idx - 1]);

            let past_line = if prev.osmid.is_root() {
                // Root-adjacent NJOI: the past is a stretch of the LKP's own
                // edge, from the LKP to the present position.
                between_positions(graph, &model.lk_position, pos)?
            } else {
                chain_linestring(graph, model, &seg[..idx], None, Some(pos))?
            };
            past.push(past_line);
            future.push(chain_linestring(graph, model, &seg[idx..], Some(pos), None)?);
        }
        None => {
            let line = chain_linestring(graph, model, seg, None, None)?;
            if model.tree.node(seg[0]).time_reached > 0.0 {
                future.push(line);
            } else {
                past.push(line);
            }
        }
    }
    Ok(())
}

/// Polyline of a tree-path segment, optionally extended by partial edges to
/// a position before the first node and/or after the last one.
///
/// Pairs starting at the synthetic root draw the partial stretch from the
/// LKP position to the first real node, since `(root, n)` is not a graph
/// edge.
fn chain_linestring(
    graph: &RoadGraph,
    model: &EscapeModel,
    seg: &[usize],
    before: Option<&Position>,
    after: Option<&Position>,
) -> GeomResult<LineString<f64>> {
    let tree: &EscapeTree = &model.tree;
    let mut lines: Vec<LineString<f64>> = Vec::with_capacity(seg.len() + 1);

    if let Some(pos) = before {
        lines.push(graph.partial_linestring(pos, tree.node(seg[0]).osmid, false)?);
    }
    if seg.len() > 1 {
        for w in seg.windows(2) {
            let (n1, n2) = (tree.node(w[0]).osmid, tree.node(w[1]).osmid);
            if n1.is_root() {
                lines.push(graph.partial_linestring(&model.lk_position, n2, false)?);
            } else {
                lines.push(graph.edge_geometry(n1, n2)?.clone());
            }
        }
    } else if lines.is_empty() && after.is_none() {
        let osmid = tree.node(seg[0]).osmid;
        let p = if osmid.is_root() {
            graph.pos_to_point(&model.lk_position)?
        } else {
            graph.node_point(osmid)?
        };
        lines.push(polyline::degenerate(p));
    }
    if let Some(pos) = after {
        lines.push(graph.partial_linestring(pos, tree.node(seg[seg.len() - 1]).osmid, true)?);
    }
    Ok(polyline::merge(&lines))
}

/// Stretch of one edge between two positions on it, oriented `a → b`.
fn between_positions(
    graph: &RoadGraph,
    a: &Position,
    b: &Position,
) -> GeomResult<LineString<f64>> {
    debug_assert!(a.u() == b.u() && a.v() == b.v(), "positions on different edges");
    let geom = graph.edge_geometry(a.u(), a.v())?;
    if a.ec() == b.ec() {
        return Ok(polyline::degenerate(graph.pos_to_point(a)?));
    }
    let mut sub = polyline::substring(geom, a.ec().min(b.ec()), a.ec().max(b.ec()));
    if a.ec() > b.ec() {
        polyline::reverse(&mut sub);
    }
    Ok(sub)
}
