//! Planar polyline helpers: interpolation, projection, substrings, merging.
//!
//! All arithmetic is done directly in lon/lat degrees.  Edge geometries span
//! a few hundred metres, so the anisotropy between the axes cancels out of
//! the *normalized* fractions these helpers trade in.

use geo::{Coord, LineString, Point};

/// Per-vertex cumulative lengths of `ls`, starting at 0.
fn cumulative_lengths(ls: &LineString<f64>) -> Vec<f64> {
    let mut acc = Vec::with_capacity(ls.0.len());
    let mut total = 0.0;
    acc.push(0.0);
    for w in ls.0.windows(2) {
        total += segment_length(w[0], w[1]);
        acc.push(total);
    }
    acc
}

#[inline]
fn segment_length(a: Coord<f64>, b: Coord<f64>) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Point at normalized fraction `frac ∈ [0, 1]` along `ls`.
///
/// A degenerate (zero-length) polyline yields its first vertex for any
/// fraction.
pub fn interpolate(ls: &LineString<f64>, frac: f64) -> Point<f64> {
    let acc = cumulative_lengths(ls);
    let total = *acc.last().unwrap_or(&0.0);
    if total == 0.0 {
        return Point::from(ls.0[0]);
    }
    let target = frac.clamp(0.0, 1.0) * total;
    for (i, w) in ls.0.windows(2).enumerate() {
        if target <= acc[i + 1] {
            let seg = acc[i + 1] - acc[i];
            let t = if seg == 0.0 { 0.0 } else { (target - acc[i]) / seg };
            return Point::new(w[0].x + (w[1].x - w[0].x) * t, w[0].y + (w[1].y - w[0].y) * t);
        }
    }
    // target == total and float dust kept it past the last bucket.
    Point::from(ls.0[ls.0.len() - 1])
}

/// Normalized fraction of the point on `ls` closest to `p`.
///
/// The planar inverse of [`interpolate`]: projecting a point that lies on
/// the polyline returns the fraction that interpolates back to it.
pub fn locate(ls: &LineString<f64>, p: Point<f64>) -> f64 {
    let acc = cumulative_lengths(ls);
    let total = *acc.last().unwrap_or(&0.0);
    if total == 0.0 {
        return 0.0;
    }

    let mut best_d2 = f64::INFINITY;
    let mut best_at = 0.0;
    for (i, w) in ls.0.windows(2).enumerate() {
        let (t, d2) = project_on_segment(p, w[0], w[1]);
        if d2 < best_d2 {
            best_d2 = d2;
            best_at = acc[i] + t * (acc[i + 1] - acc[i]);
        }
    }
    best_at / total
}

/// Clamped projection of `p` onto segment `a→b`: `(t ∈ [0,1], squared distance)`.
fn project_on_segment(p: Point<f64>, a: Coord<f64>, b: Coord<f64>) -> (f64, f64) {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.x() - a.x) * dx + (p.y() - a.y) * dy) / len2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    let d2 = (p.x() - cx).powi(2) + (p.y() - cy).powi(2);
    (t, d2)
}

/// Minimum squared planar distance from `p` to any segment of `ls`.
pub fn distance_2(ls: &LineString<f64>, p: Point<f64>) -> f64 {
    if ls.0.len() < 2 {
        let c = ls.0[0];
        return (p.x() - c.x).powi(2) + (p.y() - c.y).powi(2);
    }
    ls.0.windows(2)
        .map(|w| project_on_segment(p, w[0], w[1]).1)
        .fold(f64::INFINITY, f64::min)
}

/// Sub-polyline of `ls` between normalized fractions `f0 <= f1`.
///
/// Both cut points become vertices of the result.  `f0 == f1` yields a
/// degenerate two-point line at the cut coordinate.
pub fn substring(ls: &LineString<f64>, f0: f64, f1: f64) -> LineString<f64> {
    debug_assert!(f0 <= f1);
    let start = interpolate(ls, f0);
    let end = interpolate(ls, f1);
    if f0 >= f1 {
        return degenerate(start);
    }

    let acc = cumulative_lengths(ls);
    let total = *acc.last().unwrap_or(&0.0);
    if total == 0.0 {
        return degenerate(Point::from(ls.0[0]));
    }
    let (lo, hi) = (f0 * total, f1 * total);

    let mut coords: Vec<Coord<f64>> = vec![start.into()];
    for (i, c) in ls.0.iter().enumerate().skip(1) {
        // Interior vertices strictly between the cuts.
        if acc[i] > lo && acc[i] < hi {
            coords.push(*c);
        }
    }
    coords.push(end.into());
    dedup_coords(&mut coords);
    if coords.len() < 2 {
        return degenerate(start);
    }
    LineString::new(coords)
}

/// A zero-length two-point line at `p`; used where a path collapses onto a
/// single coordinate but downstream consumers still expect a LineString.
pub fn degenerate(p: Point<f64>) -> LineString<f64> {
    LineString::new(vec![p.into(), p.into()])
}

/// `true` if `ls` is a [`degenerate`]-shaped line.
pub fn is_degenerate(ls: &LineString<f64>) -> bool {
    ls.0.len() == 2 && coords_eq(ls.0[0], ls.0[1])
}

/// Concatenate sequential lines into one polyline.
///
/// Lines are expected end-to-start contiguous (each starts where the
/// previous one ends); the duplicated joint vertex is dropped.  A list of
/// identical degenerate lines collapses to the first one.
pub fn merge(lines: &[LineString<f64>]) -> LineString<f64> {
    assert!(!lines.is_empty(), "cannot merge an empty line list");
    if lines.iter().all(|l| is_degenerate(l) && coords_eq(l.0[0], lines[0].0[0])) {
        return lines[0].clone();
    }

    let mut coords: Vec<Coord<f64>> = Vec::new();
    for line in lines {
        for &c in &line.0 {
            if coords.last().is_none_or(|&last| !coords_eq(last, c)) {
                coords.push(c);
            }
        }
    }
    if coords.len() < 2 {
        return degenerate(Point::from(coords[0]));
    }
    LineString::new(coords)
}

/// Reverse the vertex order of `ls` in place.
pub fn reverse(ls: &mut LineString<f64>) {
    ls.0.reverse();
}

fn dedup_coords(coords: &mut Vec<Coord<f64>>) {
    coords.dedup_by(|a, b| coords_eq(*a, *b));
}

#[inline]
fn coords_eq(a: Coord<f64>, b: Coord<f64>) -> bool {
    (a.x - b.x).abs() < 1e-12 && (a.y - b.y).abs() < 1e-12
}
