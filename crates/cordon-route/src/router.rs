//! Dijkstra routing from arbitrary graph positions.
//!
//! # Starting mid-edge
//!
//! A traveler rarely starts at a node: the last known position and the
//! pursuer vehicles all sit somewhere *along* an edge.  Routing therefore
//! starts from a [`Position`] `(u, v, ec)`:
//!
//! - on a one-way edge the only option is to continue to `v`, so a single
//!   Dijkstra from `v` is offset by the remaining fraction of the edge;
//! - on a two-way edge the traveler may turn around, so Dijkstra runs from
//!   both endpoints — each run suppressing the starting edge in its own
//!   direction so the merge cannot manufacture a round-trip across it — and
//!   every node keeps the cheaper of the two offsets, preferring the route
//!   via `u` at equal time.
//!
//! # Escape nodes as sinks
//!
//! With the sink filter enabled, every edge whose source is an escape node
//! is suppressed: paths may *end* on an escape node but never pass through
//! one and re-enter the zone.  The filter also applies to snapping, so a
//! query point cannot land on a suppressed edge.
//!
//! # Cost units
//!
//! Edge costs are integer milliseconds internally (deterministic heap
//! ordering with `(cost, NodeId)` keys); results are fractional seconds
//! relative to *now* — negative means the traveler could already be past
//! that node.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use geo::Point;
use log::debug;
use rustc_hash::FxHashMap;

use cordon_core::NodeId;
use cordon_graph::{Position, RoadGraph};

use crate::error::RouteResult;

// ── ReachSet ──────────────────────────────────────────────────────────────────

/// The result of a single-source routing query.
#[derive(Debug, Clone)]
pub struct ReachSet {
    /// The (possibly snapped) position the query started from.
    pub origin: Position,
    /// Seconds until the traveler reaches each node, measured from now.
    /// Negative values mean the node could already have been passed.
    pub times: FxHashMap<NodeId, f64>,
    /// Node sequence from the starting edge's endpoint to each reached node.
    pub paths: FxHashMap<NodeId, Vec<NodeId>>,
}

impl ReachSet {
    /// Time to `n`, or `None` if the node is unreachable from the origin.
    pub fn time_to(&self, n: NodeId) -> Option<f64> {
        self.times.get(&n).copied()
    }

    pub fn path_to(&self, n: NodeId) -> Option<&[NodeId]> {
        self.paths.get(&n).map(Vec::as_slice)
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// A routing view over a shared [`RoadGraph`].
///
/// Cheap to construct per query; holds no mutable state.
pub struct Router<'g> {
    graph: &'g RoadGraph,
    escape_as_sink: bool,
}

impl<'g> Router<'g> {
    /// Router over the full graph.
    pub fn new(graph: &'g RoadGraph) -> Self {
        Self { graph, escape_as_sink: false }
    }

    /// Router that treats escape nodes as dead-ends (out-degree zero).
    pub fn with_escape_sink(graph: &'g RoadGraph) -> Self {
        Self { graph, escape_as_sink: true }
    }

    /// Snap `p` onto the effective graph and route from the snapped position.
    ///
    /// `time_elapsed` shifts all result times into the past: a traveler seen
    /// `time_elapsed` seconds ago reaches node `n` at `raw_time −
    /// time_elapsed` from now.
    pub fn route_from_point(&self, p: Point<f64>, time_elapsed: f64) -> RouteResult<ReachSet> {
        let (u, v) = self
            .graph
            .nearest_edge_where(p, |src, _| !self.suppresses_source(src))
            .ok_or(cordon_graph::GraphError::EmptyGraph)?;
        let origin = self.graph.snap_onto_edge(p, u, v)?;
        self.route_from_position(origin, time_elapsed)
    }

    /// Route from an existing graph position.
    pub fn route_from_position(
        &self,
        origin: Position,
        time_elapsed: f64,
    ) -> RouteResult<ReachSet> {
        let (u, v, ec) = (origin.u(), origin.v(), origin.ec());
        let travel_time = self.graph.edge_travel_time(u, v)?;
        let time_to_v = travel_time * (1.0 - ec);

        // The edge is effectively two-way when the reverse edge exists and
        // is not sink-suppressed.
        let two_way = self.graph.has_edge(v, u) && !self.suppresses_source(v);

        let mut times: FxHashMap<NodeId, f64> = FxHashMap::default();
        let mut paths: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();

        // A cursor sitting exactly on u degenerates to a plain single-source
        // run from that node — the traveler has not committed to the anchor
        // edge and may leave on any outgoing edge.
        if ec == 0.0 {
            let branch = self.dijkstra(u, None)?;
            for (&n, &cost) in &branch.dist {
                times.insert(n, cost as f64 / 1000.0 - time_elapsed);
                paths.insert(n, branch.path_to(n));
            }
        } else if !two_way {
            let branch = self.dijkstra(v, None)?;
            for (&n, &cost) in &branch.dist {
                times.insert(n, cost as f64 / 1000.0 + time_to_v - time_elapsed);
                paths.insert(n, branch.path_to(n));
            }
        } else {
            let time_to_u = travel_time * ec;
            let via_u = self.dijkstra(u, Some((u, v)))?;
            let via_v = self.dijkstra(v, Some((v, u)))?;

            for (&n, &cost) in &via_u.dist {
                times.insert(n, cost as f64 / 1000.0 + time_to_u - time_elapsed);
                paths.insert(n, via_u.path_to(n));
            }
            for (&n, &cost) in &via_v.dist {
                let t = cost as f64 / 1000.0 + time_to_v - time_elapsed;
                // Strict less-than: ties keep the route via u.
                if times.get(&n).is_none_or(|&best| t < best) {
                    times.insert(n, t);
                    paths.insert(n, via_v.path_to(n));
                }
            }
        }

        debug!(
            "routed from {origin}: {} nodes reachable (sink filter {})",
            times.len(),
            if self.escape_as_sink { "on" } else { "off" }
        );
        Ok(ReachSet { origin, times, paths })
    }

    /// `true` if out-edges of `src` are suppressed under the current filter.
    fn suppresses_source(&self, src: NodeId) -> bool {
        self.escape_as_sink && self.graph.is_escape(src)
    }

    fn dijkstra(&self, source: NodeId, suppressed: Option<(NodeId, NodeId)>) -> RouteResult<Branch> {
        let mut dist: FxHashMap<NodeId, u64> = FxHashMap::default();
        let mut pred: FxHashMap<NodeId, NodeId> = FxHashMap::default();

        // Min-heap: Reverse makes BinaryHeap (max) behave as min-heap.
        // Secondary key NodeId ensures deterministic expansion order.
        let mut heap: BinaryHeap<Reverse<(u64, NodeId)>> = BinaryHeap::new();
        dist.insert(source, 0);
        heap.push(Reverse((0, source)));

        while let Some(Reverse((cost, node))) = heap.pop() {
            // Skip stale heap entries.
            if dist.get(&node).is_some_and(|&d| cost > d) {
                continue;
            }
            if self.suppresses_source(node) {
                continue;
            }
            for &next in self.graph.successors(node) {
                if next == node || suppressed == Some((node, next)) {
                    continue;
                }
                let new_cost = cost.saturating_add(self.graph.edge_cost_ms(node, next)?);
                if dist.get(&next).is_none_or(|&d| new_cost < d) {
                    dist.insert(next, new_cost);
                    pred.insert(next, node);
                    heap.push(Reverse((new_cost, next)));
                }
            }
        }
        Ok(Branch { source, dist, pred })
    }
}

// ── Per-branch Dijkstra result ────────────────────────────────────────────────

struct Branch {
    source: NodeId,
    dist: FxHashMap<NodeId, u64>,
    pred: FxHashMap<NodeId, NodeId>,
}

impl Branch {
    /// Node sequence from the branch source to `n` (both inclusive).
    fn path_to(&self, n: NodeId) -> Vec<NodeId> {
        let mut path = vec![n];
        let mut cur = n;
        while cur != self.source {
            let p = self.pred[&cur];
            path.push(p);
            cur = p;
        }
        path.reverse();
        path
    }
}
