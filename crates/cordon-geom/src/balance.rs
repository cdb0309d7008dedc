//! Principal-axis analysis and balanced-polygon construction.
//!
//! The raw isochrone points often line up along one dominant road, which
//! draws as a sliver.  When the cloud's major/minor axis ratio exceeds the
//! configured threshold, two synthetic points are planted along the minor
//! axis at the major span, widening the polygon into something a map reader
//! can actually see.

use geo::{LineString, Point, Polygon};
use log::debug;

use crate::proj::LocalProjection;

// ── Principal axes ────────────────────────────────────────────────────────────

/// PCA of a 2-D point cloud: centroid, unit axis vectors, axis magnitudes
/// (square roots of the covariance eigenvalues) and point spans along each
/// axis.
#[derive(Debug, Clone, Copy)]
pub struct PrincipalAxes {
    pub centroid: Point<f64>,
    pub major_vector: (f64, f64),
    pub minor_vector: (f64, f64),
    /// Spread along each axis, `sqrt(eigenvalue)`.
    pub major_axis: f64,
    pub minor_axis: f64,
    /// Maximum absolute point projection onto each axis.
    pub major_span: f64,
    pub minor_span: f64,
}

/// Closed-form PCA of `points` (2×2 symmetric covariance, sample divisor).
///
/// A closing vertex equal to the first is dropped so closed rings weigh
/// each corner once.
pub fn principal_axes(points: &[Point<f64>]) -> PrincipalAxes {
    let mut coords: Vec<(f64, f64)> = points.iter().map(|p| (p.x(), p.y())).collect();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    let n = coords.len() as f64;
    let cx = coords.iter().map(|c| c.0).sum::<f64>() / n;
    let cy = coords.iter().map(|c| c.1).sum::<f64>() / n;

    // Sample covariance (n − 1 divisor).
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in &coords {
        let (dx, dy) = (x - cx, y - cy);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    let denom = (n - 1.0).max(1.0);
    let (sxx, sxy, syy) = (sxx / denom, sxy / denom, syy / denom);

    // Eigen-decomposition of [[sxx, sxy], [sxy, syy]], closed form.
    let half_trace = (sxx + syy) / 2.0;
    let disc = (((sxx - syy) / 2.0).powi(2) + sxy * sxy).sqrt();
    let lambda_major = half_trace + disc;
    let lambda_minor = (half_trace - disc).max(0.0);

    let major_vector = if sxy.abs() > f64::EPSILON {
        normalize((sxy, lambda_major - sxx))
    } else if sxx >= syy {
        (1.0, 0.0)
    } else {
        (0.0, 1.0)
    };
    // Symmetric matrix: the eigenvectors are orthogonal.
    let minor_vector = (-major_vector.1, major_vector.0);

    let mut major_span: f64 = 0.0;
    let mut minor_span: f64 = 0.0;
    for &(x, y) in &coords {
        let (dx, dy) = (x - cx, y - cy);
        major_span = major_span.max((dx * major_vector.0 + dy * major_vector.1).abs());
        minor_span = minor_span.max((dx * minor_vector.0 + dy * minor_vector.1).abs());
    }

    PrincipalAxes {
        centroid: Point::new(cx, cy),
        major_vector,
        minor_vector,
        major_axis: lambda_major.sqrt(),
        minor_axis: lambda_minor.sqrt(),
        major_span,
        minor_span,
    }
}

fn normalize(v: (f64, f64)) -> (f64, f64) {
    let len = (v.0 * v.0 + v.1 * v.1).sqrt();
    (v.0 / len, v.1 / len)
}

// ── Balanced polygon ──────────────────────────────────────────────────────────

/// Build a polygon through `points`, widening it along the minor principal
/// axis when the cloud is more elongated than `ratio_threshold`.
///
/// Compact clouds come back as the angularly-sorted polygon of the input
/// points; elongated ones gain two synthetic points at `centroid ±
/// minor_vector · major_span` before sorting.
pub fn balanced_polygon(points: &[Point<f64>], ratio_threshold: f64) -> Polygon<f64> {
    if points.len() < 3 {
        return ring(points.to_vec());
    }

    let projection = LocalProjection::centered_on(points);
    let projected: Vec<Point<f64>> = points.iter().map(|&p| projection.project(p)).collect();
    let axes = principal_axes(&projected);

    if axes.minor_axis > 0.0 && axes.major_axis / axes.minor_axis < ratio_threshold {
        debug!(
            "isochrone ratio {:.2} below threshold; keeping the plain polygon",
            axes.major_axis / axes.minor_axis
        );
        let mut sorted = points.to_vec();
        sort_ccw(&mut sorted, centroid(points));
        return ring(sorted);
    }

    let (cx, cy) = (axes.centroid.x(), axes.centroid.y());
    let widen1 = Point::new(
        cx + axes.minor_vector.0 * axes.major_span,
        cy + axes.minor_vector.1 * axes.major_span,
    );
    let widen2 = Point::new(
        cx - axes.minor_vector.0 * axes.major_span,
        cy - axes.minor_vector.1 * axes.major_span,
    );
    let mut widened = projected;
    widened.push(widen1);
    widened.push(widen2);
    sort_ccw(&mut widened, axes.centroid);
    ring(widened.into_iter().map(|p| projection.unproject(p)).collect())
}

fn centroid(points: &[Point<f64>]) -> Point<f64> {
    let n = points.len() as f64;
    Point::new(
        points.iter().map(|p| p.x()).sum::<f64>() / n,
        points.iter().map(|p| p.y()).sum::<f64>() / n,
    )
}

/// Sort counter-clockwise by atan2 angle around `center`.
fn sort_ccw(points: &mut [Point<f64>], center: Point<f64>) {
    points.sort_by(|a, b| {
        let aa = (a.y() - center.y()).atan2(a.x() - center.x());
        let ab = (b.y() - center.y()).atan2(b.x() - center.x());
        aa.partial_cmp(&ab).expect("atan2 never yields NaN")
    });
}

fn ring(points: Vec<Point<f64>>) -> Polygon<f64> {
    Polygon::new(LineString::from(points), vec![])
}
