//! Road-network representation and builder.
//!
//! # Data layout
//!
//! The graph is a directed multigraph keyed by OSM node IDs.  Edge records
//! live in one arena (`Vec<EdgeRecord>`); every ordered pair `(u, v)` owns an
//! [`EdgePair`] listing its parallel edges plus two precomputed
//! representatives:
//!
//! - **best** — the parallel edge with the highest highway rank.  Attribute
//!   lookups (`edge_highway_rank`, `edge_geometry`) answer from this edge,
//!   so a motorway stacked on a service road reads as a motorway.
//! - **fastest** — the parallel edge with the minimum travel time.  Routing
//!   costs and edge-cursor arithmetic use this one, matching what a
//!   shortest-path traveler would actually drive.
//!
//! # Spatial index
//!
//! Two R-trees (via `rstar`): one over node coordinates, one over edge
//! polylines (AABB envelope, min point-segment distance).  Distances are
//! squared lon/lat degrees — anisotropy at city scale is well below the
//! snapping tolerance that matters here.

use std::sync::OnceLock;

use geo::{Contains, LineString, Point, Polygon};
use log::{debug, warn};
use rstar::{AABB, PointDistance, RTree, RTreeObject};
use rustc_hash::{FxHashMap, FxHashSet};

use cordon_core::NodeId;

use crate::error::{GraphError, GraphResult};
use crate::polyline;
use crate::position::Position;

// ── Node and edge data ────────────────────────────────────────────────────────

/// Per-node attributes.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// Geographic coordinate, `x = lng`, `y = lat` (WGS-84).
    pub point: Point<f64>,
    /// `true` if the node lies inside the operational boundary.
    pub inner: bool,
}

/// Attributes of one directed edge as fed to the builder.
#[derive(Debug, Clone)]
pub struct EdgeAttrs {
    /// Travel time in seconds, strictly positive.
    pub travel_time: f64,
    /// Highway class rank, 0–6 (see [`crate::highway`]).
    pub highway_rank: u8,
    /// OSM one-way flag.  Informational: directionality is already encoded
    /// by which directed edges exist.
    pub oneway: bool,
    /// Polyline geometry in lon/lat.  When absent, the straight `u→v`
    /// segment is synthesized on first access and cached.
    pub geometry: Option<LineString<f64>>,
}

struct EdgeRecord {
    from: NodeId,
    to: NodeId,
    travel_time: f64,
    cost_ms: u64,
    highway_rank: u8,
    oneway: bool,
    geometry: OnceLock<LineString<f64>>,
}

/// Parallel edges of one ordered node pair, with the two representatives
/// described in the module docs.
struct EdgePair {
    best: usize,
    fastest: usize,
}

// ── R-tree entries ────────────────────────────────────────────────────────────

#[derive(Clone)]
struct NodeEntry {
    point: [f64; 2], // [lng, lat]
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

#[derive(Clone)]
struct EdgeEntry {
    u: NodeId,
    v: NodeId,
    coords: LineString<f64>,
    bbox: AABB<[f64; 2]>,
}

impl RTreeObject for EdgeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.bbox
    }
}

impl PointDistance for EdgeEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        polyline::distance_2(&self.coords, Point::new(point[0], point[1]))
    }
}

// ── RoadGraph ─────────────────────────────────────────────────────────────────

/// Immutable directed multigraph over a road network, shared read-only
/// across planning requests.
///
/// Do not construct directly; use [`RoadGraphBuilder`] or the GraphML loader.
pub struct RoadGraph {
    nodes: FxHashMap<NodeId, NodeData>,
    edges: Vec<EdgeRecord>,
    pairs: FxHashMap<(NodeId, NodeId), EdgePair>,
    out: FxHashMap<NodeId, Vec<NodeId>>,
    inc: FxHashMap<NodeId, Vec<NodeId>>,
    escape_nodes: Vec<NodeId>,
    escape_set: FxHashSet<NodeId>,
    boundary: Option<Polygon<f64>>,
    boundary_buff: Option<Polygon<f64>>,
    node_index: RTree<NodeEntry>,
    edge_index: RTree<EdgeEntry>,
}

impl RoadGraph {
    // ── Dimensions & basic lookups ────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct ordered node pairs with at least one edge.
    pub fn edge_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn contains_node(&self, n: NodeId) -> bool {
        self.nodes.contains_key(&n)
    }

    pub fn has_edge(&self, u: NodeId, v: NodeId) -> bool {
        self.pairs.contains_key(&(u, v))
    }

    pub fn node(&self, n: NodeId) -> GraphResult<&NodeData> {
        self.nodes.get(&n).ok_or(GraphError::MissingNode(n))
    }

    /// Geographic coordinate of a node.
    pub fn node_point(&self, n: NodeId) -> GraphResult<Point<f64>> {
        Ok(self.node(n)?.point)
    }

    /// Successors of `n`, sorted by node ID.  Empty slice for unknown nodes.
    pub fn successors(&self, n: NodeId) -> &[NodeId] {
        self.out.get(&n).map_or(&[], Vec::as_slice)
    }

    /// Predecessors of `n`, sorted by node ID.
    pub fn predecessors(&self, n: NodeId) -> &[NodeId] {
        self.inc.get(&n).map_or(&[], Vec::as_slice)
    }

    // ── Escape nodes & boundary ───────────────────────────────────────────

    /// Escape nodes in their stable load order.  This order drives
    /// candidate-ID assignment during tree construction, so it must not be
    /// re-sorted.
    pub fn escape_nodes(&self) -> &[NodeId] {
        &self.escape_nodes
    }

    pub fn is_escape(&self, n: NodeId) -> bool {
        self.escape_set.contains(&n)
    }

    pub fn boundary(&self) -> Option<&Polygon<f64>> {
        self.boundary.as_ref()
    }

    pub fn boundary_buff(&self) -> Option<&Polygon<f64>> {
        self.boundary_buff.as_ref()
    }

    // ── Edge attribute lookups ────────────────────────────────────────────

    fn pair(&self, u: NodeId, v: NodeId) -> GraphResult<&EdgePair> {
        self.pairs.get(&(u, v)).ok_or(GraphError::MissingEdge(u, v))
    }

    /// Travel time in seconds of the fastest parallel edge `u→v`.
    pub fn edge_travel_time(&self, u: NodeId, v: NodeId) -> GraphResult<f64> {
        Ok(self.edges[self.pair(u, v)?.fastest].travel_time)
    }

    /// Routing cost in integer milliseconds of the fastest parallel edge.
    pub fn edge_cost_ms(&self, u: NodeId, v: NodeId) -> GraphResult<u64> {
        Ok(self.edges[self.pair(u, v)?.fastest].cost_ms)
    }

    /// Highway rank (0–6) of the highest-ranked parallel edge `u→v`.
    pub fn edge_highway_rank(&self, u: NodeId, v: NodeId) -> GraphResult<u8> {
        Ok(self.edges[self.pair(u, v)?.best].highway_rank)
    }

    /// OSM one-way flag of the highest-ranked parallel edge `u→v`.
    pub fn edge_is_oneway(&self, u: NodeId, v: NodeId) -> GraphResult<bool> {
        Ok(self.edges[self.pair(u, v)?.best].oneway)
    }

    /// Polyline of the highest-ranked parallel edge `u→v`, oriented `u→v`.
    ///
    /// Synthesizes and caches the straight segment when the network file
    /// carried no geometry.  The cache insert is thread-safe and idempotent.
    pub fn edge_geometry(&self, u: NodeId, v: NodeId) -> GraphResult<&LineString<f64>> {
        let record = &self.edges[self.pair(u, v)?.best];
        if let Some(geom) = record.geometry.get() {
            return Ok(geom);
        }
        let a = self.node_point(u)?;
        let b = self.node_point(v)?;
        Ok(record.geometry.get_or_init(|| LineString::new(vec![a.into(), b.into()])))
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// The node nearest to `p`, or `None` on an empty graph.
    pub fn nearest_node(&self, p: Point<f64>) -> Option<NodeId> {
        self.node_index.nearest_neighbor(&[p.x(), p.y()]).map(|e| e.id)
    }

    /// The edge nearest to `p`, or `None` on an empty graph.
    pub fn nearest_edge(&self, p: Point<f64>) -> Option<(NodeId, NodeId)> {
        self.nearest_edge_where(p, |_, _| true)
    }

    /// The nearest edge satisfying `keep(u, v)`.  Used by the router's
    /// sink filter so snapping cannot land on a suppressed edge.
    pub fn nearest_edge_where(
        &self,
        p: Point<f64>,
        keep: impl Fn(NodeId, NodeId) -> bool,
    ) -> Option<(NodeId, NodeId)> {
        self.edge_index
            .nearest_neighbor_iter(&[p.x(), p.y()])
            .find(|e| keep(e.u, e.v))
            .map(|e| (e.u, e.v))
    }

    // ── Position factories ────────────────────────────────────────────────

    /// Position from an explicit edge reference.  Validates that `u→v` is a
    /// real edge and that the cursor is in range.
    pub fn position(&self, u: NodeId, v: NodeId, ec: f64) -> GraphResult<Position> {
        if !self.has_edge(u, v) {
            return Err(GraphError::MissingEdge(u, v));
        }
        if !(0.0..=1.0).contains(&ec) {
            return Err(GraphError::EdgeCursorOutOfRange { u, v, ec });
        }
        Ok(Position::new(u, v, ec, None))
    }

    /// Position anchored at node `u`: cursor 0 on the first outgoing edge.
    ///
    /// Fails with [`GraphError::NoSuccessor`] if `u` has no outgoing edge.
    pub fn position_at_node(&self, u: NodeId) -> GraphResult<Position> {
        let v = *self.successors(u).first().ok_or(GraphError::NoSuccessor(u))?;
        let pos = Position::new(u, v, 0.0, None);
        pos.cache_point(self.node_point(u)?);
        Ok(pos)
    }

    /// Snap a geographic point onto the graph.
    ///
    /// With `on_node = true` the point snaps to the nearest node (cursor 0
    /// on its first outgoing edge); otherwise it projects onto the polyline
    /// of the nearest edge.  Fails only when the graph is empty.
    pub fn snap(&self, p: Point<f64>, on_node: bool) -> GraphResult<Position> {
        if on_node {
            let u = self.nearest_node(p).ok_or(GraphError::EmptyGraph)?;
            let v = *self.successors(u).first().ok_or(GraphError::NoSuccessor(u))?;
            let pos = Position::new(u, v, 0.0, Some(p));
            pos.cache_point(self.node_point(u)?);
            Ok(pos)
        } else {
            let (u, v) = self.nearest_edge(p).ok_or(GraphError::EmptyGraph)?;
            self.snap_onto_edge(p, u, v)
        }
    }

    /// Project `p` onto the polyline of edge `u→v`.
    pub fn snap_onto_edge(&self, p: Point<f64>, u: NodeId, v: NodeId) -> GraphResult<Position> {
        let geom = self.edge_geometry(u, v)?;
        let ec = polyline::locate(geom, p);
        Ok(Position::new(u, v, ec, Some(p)))
    }

    /// Geographic point of a position, interpolated along the edge polyline
    /// and cached on the position.
    pub fn pos_to_point(&self, pos: &Position) -> GraphResult<Point<f64>> {
        if let Some(p) = pos.cached_point() {
            return Ok(p);
        }
        let geom = self.edge_geometry(pos.u(), pos.v())?;
        let p = polyline::interpolate(geom, pos.ec());
        pos.cache_point(p);
        Ok(p)
    }

    /// Move a position along its edge by `duration` seconds of travel,
    /// toward `v` or back toward `u`.
    ///
    /// Fails if the move would leave the edge; traversal across multiple
    /// edges is the router's job, not the cursor's.
    pub fn advance_position(
        &self,
        pos: &Position,
        duration: f64,
        toward_v: bool,
    ) -> GraphResult<Position> {
        let tt = self.edge_travel_time(pos.u(), pos.v())?;
        let delta = duration / tt;
        let ec = if toward_v { pos.ec() + delta } else { pos.ec() - delta };
        // Tolerate float dust right at the endpoints.
        let ec = if ec > 1.0 && ec < 1.0 + 1e-9 {
            1.0
        } else if ec < 0.0 && ec > -1e-9 {
            0.0
        } else {
            ec
        };
        self.position(pos.u(), pos.v(), ec)
    }

    // ── Polyline construction ─────────────────────────────────────────────

    /// Sub-polyline of `pos`'s edge from the position to `endpoint` (one of
    /// the edge endpoints); with `reverse`, from the endpoint to the
    /// position.  Collapses to a degenerate two-point line when the cursor
    /// already sits on the endpoint.
    pub fn partial_linestring(
        &self,
        pos: &Position,
        endpoint: NodeId,
        reverse: bool,
    ) -> GraphResult<LineString<f64>> {
        let (u, v, ec) = (pos.u(), pos.v(), pos.ec());
        let mut line = if endpoint == v {
            if ec == 1.0 {
                return Ok(polyline::degenerate(self.node_point(v)?));
            }
            // substring runs pos → v, which is the unreversed orientation.
            let geom = self.edge_geometry(u, v)?;
            let mut sub = polyline::substring(geom, ec, 1.0);
            if reverse {
                polyline::reverse(&mut sub);
            }
            sub
        } else if endpoint == u {
            if ec == 0.0 {
                return Ok(polyline::degenerate(self.node_point(u)?));
            }
            // substring runs u → pos; flip unless the caller wants u first.
            let geom = self.edge_geometry(u, v)?;
            let mut sub = polyline::substring(geom, 0.0, ec);
            if !reverse {
                polyline::reverse(&mut sub);
            }
            sub
        } else {
            return Err(GraphError::EndpointNotOnEdge { u, v, node: endpoint });
        };
        // Guard against zero-length substrings produced by an extreme cursor.
        if line.0.len() < 2 {
            line = polyline::degenerate(self.pos_to_point(pos)?);
        }
        Ok(line)
    }

    /// Stitch the edge polylines along a node path into one LineString.
    ///
    /// With `prefix`, a partial linestring from that position to the first
    /// path node is prepended; the position must lie on an edge adjacent to
    /// `nodes[0]`.
    pub fn path_linestring(
        &self,
        nodes: &[NodeId],
        prefix: Option<&Position>,
    ) -> GraphResult<LineString<f64>> {
        if nodes.is_empty() {
            return Err(GraphError::EmptyPath);
        }

        let mut lines: Vec<LineString<f64>> = Vec::with_capacity(nodes.len());
        if let Some(pos) = prefix {
            if !pos.touches(nodes[0]) {
                return Err(GraphError::DetachedPrefix {
                    u: pos.u(),
                    v: pos.v(),
                    start: nodes[0],
                });
            }
            lines.push(self.partial_linestring(pos, nodes[0], false)?);
        }
        for w in nodes.windows(2) {
            lines.push(self.edge_geometry(w[0], w[1])?.clone());
        }
        if lines.is_empty() {
            return Ok(polyline::degenerate(self.node_point(nodes[0])?));
        }
        Ok(polyline::merge(&lines))
    }
}

// ── RoadGraphBuilder ──────────────────────────────────────────────────────────

/// Construct a [`RoadGraph`] incrementally, then call [`build`](Self::build).
///
/// The builder accepts nodes and directed edges in any order.  `build()`
/// validates edge endpoints, prunes isolated nodes, resolves the per-pair
/// parallel-edge representatives, and bulk-loads both R-trees.
pub struct RoadGraphBuilder {
    nodes: FxHashMap<NodeId, NodeData>,
    raw_edges: Vec<(NodeId, NodeId, EdgeAttrs)>,
    escape_nodes: Vec<NodeId>,
    boundary: Option<Polygon<f64>>,
    boundary_buff: Option<Polygon<f64>>,
}

impl RoadGraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            raw_edges: Vec::new(),
            escape_nodes: Vec::new(),
            boundary: None,
            boundary_buff: None,
        }
    }

    /// Add (or overwrite) a node.
    pub fn add_node(&mut self, id: NodeId, lng: f64, lat: f64, inner: bool) {
        self.nodes.insert(id, NodeData { point: Point::new(lng, lat), inner });
    }

    /// Add a **directed** edge `u→v`.  Parallel edges are allowed.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId, attrs: EdgeAttrs) {
        self.raw_edges.push((u, v, attrs));
    }

    /// Declare the escape nodes in their canonical order.
    pub fn set_escape_nodes(&mut self, nodes: Vec<NodeId>) {
        self.escape_nodes = nodes;
    }

    /// Attach the operational boundary and its buffer.
    pub fn set_boundaries(&mut self, boundary: Polygon<f64>, boundary_buff: Polygon<f64>) {
        self.boundary = Some(boundary);
        self.boundary_buff = Some(boundary_buff);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.raw_edges.len()
    }

    /// Consume the builder and produce a [`RoadGraph`].
    pub fn build(self) -> GraphResult<RoadGraph> {
        let mut nodes = self.nodes;

        // Every edge must reference existing endpoints.
        for (u, v, _) in &self.raw_edges {
            if !nodes.contains_key(u) {
                return Err(GraphError::MissingNode(*u));
            }
            if !nodes.contains_key(v) {
                return Err(GraphError::MissingNode(*v));
            }
        }

        // Prune nodes with neither incoming nor outgoing edges.
        let mut connected: FxHashSet<NodeId> = FxHashSet::default();
        for (u, v, _) in &self.raw_edges {
            connected.insert(*u);
            connected.insert(*v);
        }
        let before = nodes.len();
        nodes.retain(|id, _| connected.contains(id));
        if nodes.len() < before {
            debug!("pruned {} isolated nodes", before - nodes.len());
        }

        // Edge arena + per-pair representatives + adjacency.
        let mut edges: Vec<EdgeRecord> = Vec::with_capacity(self.raw_edges.len());
        let mut pairs: FxHashMap<(NodeId, NodeId), EdgePair> = FxHashMap::default();
        let mut out: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        let mut inc: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();

        for (u, v, attrs) in self.raw_edges {
            let idx = edges.len();
            let geometry = OnceLock::new();
            if let Some(g) = attrs.geometry {
                let _ = geometry.set(g);
            }
            edges.push(EdgeRecord {
                from: u,
                to: v,
                travel_time: attrs.travel_time,
                cost_ms: (attrs.travel_time * 1000.0).round() as u64,
                highway_rank: attrs.highway_rank,
                oneway: attrs.oneway,
                geometry,
            });

            pairs
                .entry((u, v))
                .and_modify(|pair| {
                    if edges[idx].highway_rank > edges[pair.best].highway_rank {
                        pair.best = idx;
                    }
                    if edges[idx].travel_time < edges[pair.fastest].travel_time {
                        pair.fastest = idx;
                    }
                })
                .or_insert_with(|| {
                    out.entry(u).or_default().push(v);
                    inc.entry(v).or_default().push(u);
                    EdgePair { best: idx, fastest: idx }
                });
        }
        for neighbors in out.values_mut().chain(inc.values_mut()) {
            neighbors.sort_unstable();
        }

        // Escape nodes: must exist; inbound-edge and boundary checks are
        // advisory because real extracts have border artifacts.
        let escape_set: FxHashSet<NodeId> = self.escape_nodes.iter().copied().collect();
        for &e in &self.escape_nodes {
            let data = nodes.get(&e).ok_or(GraphError::MissingNode(e))?;
            if !inc.contains_key(&e) {
                warn!("escape node {e} has no inbound edge and can never be reached");
            }
            if let Some(boundary) = &self.boundary {
                if boundary.contains(&data.point) {
                    warn!("escape node {e} lies inside the operational boundary");
                }
            }
        }

        // Bulk-load both R-trees.
        let node_entries: Vec<NodeEntry> = nodes
            .iter()
            .map(|(&id, data)| NodeEntry { point: [data.point.x(), data.point.y()], id })
            .collect();
        let edge_entries: Vec<EdgeEntry> = pairs
            .iter()
            .map(|(&(u, v), pair)| {
                let record = &edges[pair.best];
                let coords = match record.geometry.get() {
                    Some(g) => g.clone(),
                    None => LineString::new(vec![
                        nodes[&record.from].point.into(),
                        nodes[&record.to].point.into(),
                    ]),
                };
                let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
                let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
                for c in &coords.0 {
                    min_x = min_x.min(c.x);
                    min_y = min_y.min(c.y);
                    max_x = max_x.max(c.x);
                    max_y = max_y.max(c.y);
                }
                EdgeEntry { u, v, coords, bbox: AABB::from_corners([min_x, min_y], [max_x, max_y]) }
            })
            .collect();

        Ok(RoadGraph {
            nodes,
            edges,
            pairs,
            out,
            inc,
            escape_nodes: self.escape_nodes,
            escape_set,
            boundary: self.boundary,
            boundary_buff: self.boundary_buff,
            node_index: RTree::bulk_load(node_entries),
            edge_index: RTree::bulk_load(edge_entries),
        })
    }
}

impl Default for RoadGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
