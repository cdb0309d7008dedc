//! A location on the road graph, parameterized by an edge and a cursor.

use std::fmt;
use std::sync::OnceLock;

use geo::Point;

use cordon_core::NodeId;

/// A point on the graph expressed as `(u, v, ec)` where `ec ∈ [0, 1]` is the
/// fraction traversed along the polyline of edge `u→v`: `ec = 0` coincides
/// with `u`, `ec = 1` with `v`.
///
/// Positions are only created through [`RoadGraph`](crate::RoadGraph)
/// factory methods, which validate the cursor range and that `u→v` is a real
/// edge.  The geographic point is computed at most once per `Position` and
/// cached (identity-keyed, thread-safe); equality considers `(u, v, ec)`
/// only.
#[derive(Debug, Clone)]
pub struct Position {
    u: NodeId,
    v: NodeId,
    ec: f64,
    /// The raw input coordinate this position was snapped from, if any.
    init_point: Option<Point<f64>>,
    point: OnceLock<Point<f64>>,
}

impl Position {
    pub(crate) fn new(u: NodeId, v: NodeId, ec: f64, init_point: Option<Point<f64>>) -> Self {
        Self { u, v, ec, init_point, point: OnceLock::new() }
    }

    /// Source node of the edge this position lies on.
    #[inline]
    pub fn u(&self) -> NodeId {
        self.u
    }

    /// Target node of the edge this position lies on.
    #[inline]
    pub fn v(&self) -> NodeId {
        self.v
    }

    /// Edge cursor in `[0, 1]`.
    #[inline]
    pub fn ec(&self) -> f64 {
        self.ec
    }

    /// The raw coordinate this position was snapped from, when it was
    /// created from a geographic point rather than an edge reference.
    pub fn init_point(&self) -> Option<Point<f64>> {
        self.init_point
    }

    /// `true` if `node` is one of the two endpoints of this position's edge.
    pub fn touches(&self, node: NodeId) -> bool {
        node == self.u || node == self.v
    }

    pub(crate) fn cached_point(&self) -> Option<Point<f64>> {
        self.point.get().copied()
    }

    /// Idempotent: a concurrent second write of the same value is a no-op.
    pub(crate) fn cache_point(&self, p: Point<f64>) {
        let _ = self.point.set(p);
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.u == other.u && self.v == other.v && self.ec == other.ec
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position(u={}, v={}, ec={})", self.u, self.v, self.ec)
    }
}
