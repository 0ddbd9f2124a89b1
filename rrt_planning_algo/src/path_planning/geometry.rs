//! Geometry primitives for axis-aligned boxes, segments and circles
//!
//! All tests are closed: touching counts as intersecting. This keeps the
//! collision checks in [`crate::path_planning::space`] consistent with the
//! intersection points used to pull blocked motions back.

use nalgebra::{Point2, Vector2};

/// Check whether `point` lies inside the closed box `[min, max]`
pub fn point_in_box(min: &Point2<f64>, max: &Point2<f64>, point: &Point2<f64>) -> bool {
    point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
}

/// Z component of the cross product of two planar vectors
fn cross(u: &Vector2<f64>, v: &Vector2<f64>) -> f64 {
    u.x * v.y - u.y * v.x
}

/// Orientation of `c` relative to the directed line `a -> b`
///
/// Positive for a left turn, negative for a right turn, zero when collinear.
fn orientation(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    cross(&(b - a), &(c - a))
}

/// For a point known to be collinear with `a`-`b`, check that it lies between them
fn on_segment(a: &Point2<f64>, b: &Point2<f64>, p: &Point2<f64>) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Check whether segment `a1`-`a2` touches or crosses segment `b1`-`b2`
///
/// Collinear overlap and shared endpoints count as intersections.
pub fn segments_intersect(
    a1: &Point2<f64>,
    a2: &Point2<f64>,
    b1: &Point2<f64>,
    b2: &Point2<f64>,
) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    let straddles_b = (d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0);
    let straddles_a = (d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0);
    if straddles_a && straddles_b {
        return true;
    }

    (d1 == 0.0 && on_segment(b1, b2, a1))
        || (d2 == 0.0 && on_segment(b1, b2, a2))
        || (d3 == 0.0 && on_segment(a1, a2, b1))
        || (d4 == 0.0 && on_segment(a1, a2, b2))
}

/// Find where segment `a1`-`a2` meets segment `b1`-`b2`
///
/// Returns `Some` exactly when [`segments_intersect`] holds. When the segments
/// overlap along a common line the overlap point closest to `a1` is returned.
pub fn find_intersection_point(
    a1: &Point2<f64>,
    a2: &Point2<f64>,
    b1: &Point2<f64>,
    b2: &Point2<f64>,
) -> Option<Point2<f64>> {
    if !segments_intersect(a1, a2, b1, b2) {
        return None;
    }

    let r = a2 - a1;
    let s = b2 - b1;
    let denom = cross(&r, &s);

    if denom != 0.0 {
        let t = (cross(&(b1 - a1), &s) / denom).clamp(0.0, 1.0);
        return Some(a1 + r * t);
    }

    // Parallel and touching: the overlap is bounded by endpoints of both segments
    [*a1, *a2, *b1, *b2]
        .into_iter()
        .filter(|p| on_segment(a1, a2, p) && on_segment(b1, b2, p))
        .min_by(|p, q| {
            nalgebra::distance_squared(a1, p).total_cmp(&nalgebra::distance_squared(a1, q))
        })
}

/// Check whether the closed disc at `center` overlaps the closed box `[rect_min, rect_max]`
///
/// Covers full containment in either direction, edge overlap and corner-only
/// overlap by measuring the distance from the centre to the nearest box point.
pub fn ball_intersects_rect(
    center: &Point2<f64>,
    radius: f64,
    rect_min: &Point2<f64>,
    rect_max: &Point2<f64>,
) -> bool {
    let closest = Point2::new(
        center.x.clamp(rect_min.x, rect_max.x),
        center.y.clamp(rect_min.y, rect_max.y),
    );
    nalgebra::distance_squared(center, &closest) <= radius * radius
}

/// Check whether segment `p1`-`p2` passes within `radius` of `center`
pub fn segment_intersects_circle(
    center: &Point2<f64>,
    radius: f64,
    p1: &Point2<f64>,
    p2: &Point2<f64>,
) -> bool {
    let seg = p2 - p1;
    let len2 = seg.norm_squared();
    let t = if len2 > 0.0 {
        ((center - p1).dot(&seg) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let foot = p1 + seg * t;
    nalgebra::distance_squared(center, &foot) <= radius * radius
}
