//! Local metric projection.
//!
//! Polygon balancing needs distances in metres, not degrees.  Instead of a
//! full cartographic projection this uses an equirectangular plane anchored
//! at the point cloud's centroid: exact to well under a metre across a
//! department-sized area, dependency-free, and — unlike a real projection —
//! trivially and exactly invertible, which the round-trip contract of the
//! isochrone pipeline relies on.

use geo::Point;

/// Metres per degree of latitude (spherical earth, mean radius).
const METERS_PER_DEG: f64 = 6_371_000.0 * std::f64::consts::PI / 180.0;

/// An equirectangular lon/lat ↔ metric plane mapping anchored at one point.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    lng0: f64,
    lat0: f64,
    k_x: f64,
}

impl LocalProjection {
    /// Projection anchored at the centroid of `points`.
    ///
    /// Anchoring at the centroid keeps the cosine-of-latitude scale error
    /// negligible over the span of one isochrone.
    pub fn centered_on(points: &[Point<f64>]) -> Self {
        let n = points.len().max(1) as f64;
        let lng0 = points.iter().map(|p| p.x()).sum::<f64>() / n;
        let lat0 = points.iter().map(|p| p.y()).sum::<f64>() / n;
        Self { lng0, lat0, k_x: METERS_PER_DEG * lat0.to_radians().cos() }
    }

    /// Geographic → metric plane (metres east/north of the anchor).
    pub fn project(&self, p: Point<f64>) -> Point<f64> {
        Point::new((p.x() - self.lng0) * self.k_x, (p.y() - self.lat0) * METERS_PER_DEG)
    }

    /// Metric plane → geographic.
    pub fn unproject(&self, p: Point<f64>) -> Point<f64> {
        Point::new(p.x() / self.k_x + self.lng0, p.y() / METERS_PER_DEG + self.lat0)
    }
}
