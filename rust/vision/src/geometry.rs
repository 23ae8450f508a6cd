// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar geometry helpers: hulls, polygon measures, line fitting,
//! polyline simplification and segment intersection.

use nalgebra::{Matrix2, SymmetricEigen, Vector2};

use crate::types::Point2D;

/// A total-least-squares line: passes through `centroid` along unit `direction`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedLine {
    pub centroid: Point2D,
    pub direction: Vector2<f64>,
}

impl FittedLine {
    /// Signed position of `p` along the line direction
    pub fn project(&self, p: &Point2D) -> f64 {
        (p.x - self.centroid.x) * self.direction.x + (p.y - self.centroid.y) * self.direction.y
    }

    pub fn point_at(&self, t: f64) -> Point2D {
        Point2D::new(
            self.centroid.x + t * self.direction.x,
            self.centroid.y + t * self.direction.y,
        )
    }

    /// Perpendicular distance from `p` to the infinite line
    pub fn distance(&self, p: &Point2D) -> f64 {
        let dx = p.x - self.centroid.x;
        let dy = p.y - self.centroid.y;
        (dx * self.direction.y - dy * self.direction.x).abs()
    }
}

/// Fit a line through points using the principal axis of their covariance
///
/// Returns `None` for fewer than two points or when every point coincides.
pub fn fit_line(points: &[Point2D]) -> Option<FittedLine> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for p in points {
        let dx = p.x - cx;
        let dy = p.y - cy;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx + syy < 1e-12 {
        return None;
    }

    let eigen = SymmetricEigen::new(Matrix2::new(sxx, sxy, sxy, syy));
    let major = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] { 0 } else { 1 };
    let direction = eigen.eigenvectors.column(major).into_owned();
    let norm = direction.norm();
    if norm < 1e-12 {
        return None;
    }

    Some(FittedLine {
        centroid: Point2D::new(cx, cy),
        direction: direction / norm,
    })
}

fn cross(o: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Convex hull via Andrew's monotone chain, counter-clockwise, no repeated end point
pub fn convex_hull(points: &[Point2D]) -> Vec<Point2D> {
    let mut sorted: Vec<Point2D> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<Point2D> = Vec::new();
    for p in &sorted {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point2D> = Vec::new();
    for p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Polygon area using the shoelace formula
pub fn polygon_area(points: &[Point2D]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }

    (area / 2.0).abs()
}

/// Closed polygon perimeter
pub fn polygon_perimeter(points: &[Point2D]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    (0..n).map(|i| points[i].distance_to(&points[(i + 1) % n])).sum()
}

/// Ramer-Douglas-Peucker simplification
///
/// Interior points are dropped unless the chord deviation exceeds `epsilon`,
/// in which case the polyline splits at the farthest point.
pub fn douglas_peucker(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = &points[0];
    let last = &points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_idx = 0;

    for (i, point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = perpendicular_distance(point, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        let left = douglas_peucker(&points[..=max_idx], epsilon);
        let right = douglas_peucker(&points[max_idx..], epsilon);

        let mut result = left;
        result.extend_from_slice(&right[1..]);
        result
    } else {
        vec![*first, *last]
    }
}

/// Distance from `point` to the infinite line through `line_start` and `line_end`
pub fn perpendicular_distance(point: &Point2D, line_start: &Point2D, line_end: &Point2D) -> f64 {
    let dx = line_end.x - line_start.x;
    let dy = line_end.y - line_start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < 1e-10 {
        return point.distance_to(line_start);
    }

    ((point.x - line_start.x) * dy - (point.y - line_start.y) * dx).abs() / length_sq.sqrt()
}

/// Orientation of the triple: >0 counter-clockwise, <0 clockwise, 0 collinear
pub fn orientation(a: &Point2D, b: &Point2D, c: &Point2D) -> f64 {
    cross(a, b, c)
}

/// True when segments `p1-p2` and `p3-p4` properly cross
///
/// Each segment's endpoints must lie strictly on opposite sides of the
/// other. Touching at an endpoint or running collinear does not count.
pub fn segments_intersect(p1: &Point2D, p2: &Point2D, p3: &Point2D, p4: &Point2D) -> bool {
    const EPS: f64 = 1e-9;
    let d1 = orientation(p3, p4, p1);
    let d2 = orientation(p3, p4, p2);
    let d3 = orientation(p1, p2, p3);
    let d4 = orientation(p1, p2, p4);

    ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
        && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
}

/// True when wall `s-e` touches the open segment `a-b`
///
/// Blocks on a proper crossing, on a wall endpoint lying strictly inside the
/// segment (corners, T-junctions, walls split at a junction) and on collinear
/// overlap. Contact at `a` or `b` themselves is allowed so nodes sitting on a
/// wall line, such as door hinges, stay linkable.
pub fn line_of_sight_blocked(a: &Point2D, b: &Point2D, s: &Point2D, e: &Point2D) -> bool {
    const EPS: f64 = 1e-6;
    if segments_intersect(a, b, s, e) {
        return true;
    }
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length = (dx * dx + dy * dy).sqrt();
    if length < EPS {
        return false;
    }

    let on_line = |p: &Point2D| perpendicular_distance(p, a, b) < EPS;
    let param = |p: &Point2D| ((p.x - a.x) * dx + (p.y - a.y) * dy) / (length * length);
    let strictly_inside = |p: &Point2D| {
        let t = param(p);
        on_line(p) && t * length > EPS && (1.0 - t) * length > EPS
    };
    if strictly_inside(s) || strictly_inside(e) {
        return true;
    }

    if on_line(s) && on_line(e) {
        let (ts, te) = (param(s), param(e));
        let overlap = ts.max(te).min(1.0) - ts.min(te).max(0.0);
        return overlap * length > EPS;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_douglas_peucker() {
        let points = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.1),
            Point2D::new(2.0, -0.1),
            Point2D::new(3.0, 0.0),
            Point2D::new(4.0, 0.0),
        ];
        assert_eq!(douglas_peucker(&points, 0.5).len(), 2);

        let corner = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(50.0, 0.0),
            Point2D::new(100.0, 0.0),
            Point2D::new(100.0, 50.0),
        ];
        let simplified = douglas_peucker(&corner, 10.0);
        assert_eq!(simplified.len(), 3);
        assert_eq!(simplified[1], Point2D::new(100.0, 0.0));
    }

    #[test]
    fn test_perpendicular_distance() {
        let dist = perpendicular_distance(
            &Point2D::new(5.0, 5.0),
            &Point2D::new(0.0, 0.0),
            &Point2D::new(10.0, 0.0),
        );
        assert_relative_eq!(dist, 5.0);
    }

    #[test]
    fn hull_of_square_with_interior_points() {
        let pts = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(0.0, 10.0),
            Point2D::new(5.0, 5.0),
            Point2D::new(3.0, 7.0),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert_relative_eq!(polygon_area(&hull), 100.0);
        assert_relative_eq!(polygon_perimeter(&hull), 40.0);
    }

    #[test]
    fn fit_line_recovers_diagonal() {
        let pts: Vec<Point2D> = (0..10).map(|i| Point2D::new(i as f64, i as f64)).collect();
        let line = fit_line(&pts).unwrap();
        assert_relative_eq!(line.direction.x.abs(), std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-9);
        assert_relative_eq!(line.distance(&Point2D::new(5.0, 5.0)), 0.0, epsilon = 1e-9);
        assert!(fit_line(&[Point2D::new(1.0, 1.0), Point2D::new(1.0, 1.0)]).is_none());
    }

    #[test]
    fn crossing_segments() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(10.0, 10.0);
        assert!(segments_intersect(&a, &b, &Point2D::new(0.0, 10.0), &Point2D::new(10.0, 0.0)));
        // Shared endpoint is a touch, not a crossing
        assert!(!segments_intersect(&a, &b, &b, &Point2D::new(20.0, 0.0)));
        // Disjoint
        assert!(!segments_intersect(&a, &b, &Point2D::new(20.0, 0.0), &Point2D::new(30.0, 5.0)));
    }

    #[test]
    fn wall_junction_on_the_segment_blocks() {
        let a = Point2D::new(200.0, 200.0);
        let b = Point2D::new(300.0, 200.0);
        // Partition stored as two pieces meeting on the segment
        let upper = (Point2D::new(250.0, 0.0), Point2D::new(250.0, 200.0));
        let lower = (Point2D::new(250.0, 200.0), Point2D::new(250.0, 400.0));
        assert!(!segments_intersect(&a, &b, &upper.0, &upper.1));
        assert!(line_of_sight_blocked(&a, &b, &upper.0, &upper.1));
        assert!(line_of_sight_blocked(&a, &b, &lower.0, &lower.1));
    }

    #[test]
    fn wall_corner_on_the_segment_blocks() {
        let a = Point2D::new(300.0, 150.0);
        let b = Point2D::new(200.0, 250.0);
        let corner = Point2D::new(250.0, 200.0);
        assert!(line_of_sight_blocked(&a, &b, &Point2D::new(250.0, 0.0), &corner));
        assert!(line_of_sight_blocked(&a, &b, &corner, &Point2D::new(500.0, 200.0)));
    }

    #[test]
    fn collinear_overlap_blocks_but_touching_ends_do_not() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(100.0, 0.0);
        // Runs along a wall that covers the whole segment
        assert!(line_of_sight_blocked(&a, &b, &Point2D::new(-50.0, 0.0), &Point2D::new(150.0, 0.0)));
        // Collinear but beyond the end
        assert!(!line_of_sight_blocked(&a, &b, &Point2D::new(100.0, 0.0), &Point2D::new(200.0, 0.0)));
        // Segment starts on a wall line and leaves it (a hinge in a wall)
        assert!(!line_of_sight_blocked(&a, &Point2D::new(0.0, 80.0), &Point2D::new(-40.0, 0.0), &Point2D::new(40.0, 0.0)));
        // Wall ends short of the segment
        assert!(!line_of_sight_blocked(&a, &b, &Point2D::new(50.0, 10.0), &Point2D::new(50.0, 60.0)));
        // Degenerate segment
        assert!(!line_of_sight_blocked(&a, &a, &Point2D::new(-1.0, 0.0), &Point2D::new(1.0, 0.0)));
    }
}
