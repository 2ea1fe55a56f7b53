//! Planar geometry primitives: polygon containment and segment crossing.
//!
//! Everything works on horizontal `(x, y)` coordinates; vertical position is
//! handled separately by the callers.

/// Tolerance for on-segment and collinearity tests.
pub const EPS: f64 = 1e-9;

/// A point in the horizontal plane.
pub type Point2 = [f64; 2];

fn cross(o: Point2, a: Point2, b: Point2) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

fn scale(a: Point2, b: Point2) -> f64 {
    let s = (b[0] - a[0]).abs().max((b[1] - a[1]).abs());
    s.max(1.0)
}

/// True if `p` lies on the closed segment `a`–`b`.
pub fn is_point_on_segment(p: Point2, a: Point2, b: Point2) -> bool {
    if cross(a, b, p).abs() > EPS * scale(a, b) * scale(a, p) {
        return false;
    }
    p[0] >= a[0].min(b[0]) - EPS
        && p[0] <= a[0].max(b[0]) + EPS
        && p[1] >= a[1].min(b[1]) - EPS
        && p[1] <= a[1].max(b[1]) + EPS
}

/// Checks if a point lies inside a simple polygon.
///
/// If `boundary_in` is true, points on edges or vertices count as inside.
pub fn is_point_inside_polygon(p: Point2, polygon: &[Point2], boundary_in: bool) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        if is_point_on_segment(p, polygon[i], polygon[(i + 1) % n]) {
            return boundary_in;
        }
    }
    // Even-odd ray casting towards +x.
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a[1] > p[1]) != (b[1] > p[1]) {
            let x = a[0] + (p[1] - a[1]) * (b[0] - a[0]) / (b[1] - a[1]);
            if p[0] < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// True if the closed segments `p1`–`p2` and `q1`–`q2` share a point.
pub fn segments_intersect(p1: Point2, p2: Point2, q1: Point2, q2: Point2) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);
    let tol = EPS * scale(p1, p2) * scale(q1, q2);

    if ((d1 > tol && d2 < -tol) || (d1 < -tol && d2 > tol))
        && ((d3 > tol && d4 < -tol) || (d3 < -tol && d4 > tol))
    {
        return true;
    }
    // Touching and collinear cases.
    is_point_on_segment(p1, q1, q2)
        || is_point_on_segment(p2, q1, q2)
        || is_point_on_segment(q1, p1, p2)
        || is_point_on_segment(q2, p1, p2)
}

/// Manhattan distance in three dimensions.
#[inline]
pub fn l1_distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    (a[0] - b[0]).abs() + (a[1] - b[1]).abs() + (a[2] - b[2]).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point2> {
        vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
    }

    #[test]
    fn test_point_inside_square() {
        let sq = square();
        assert!(is_point_inside_polygon([0.5, 0.5], &sq, false));
        assert!(!is_point_inside_polygon([1.5, 0.5], &sq, true));
    }

    #[test]
    fn test_boundary_flag() {
        let sq = square();
        assert!(is_point_inside_polygon([1.0, 0.5], &sq, true));
        assert!(!is_point_inside_polygon([1.0, 0.5], &sq, false));
        assert!(is_point_inside_polygon([0.0, 0.0], &sq, true));
    }

    #[test]
    fn test_trapezoid() {
        let trap = vec![[0.0, 0.0], [3.0, 3.0], [7.0, 3.0], [10.0, 0.0]];
        assert!(is_point_inside_polygon([5.0, 1.0], &trap, false));
        assert!(is_point_inside_polygon([1.5, 1.5], &trap, true));
        assert!(!is_point_inside_polygon([1.5, 1.5], &trap, false));
        assert!(!is_point_inside_polygon([0.5, 2.0], &trap, true));
    }

    #[test]
    fn test_segment_crossing() {
        assert!(segments_intersect([0.0, -1.0], [0.0, 1.0], [-1.0, 0.0], [1.0, 0.0]));
        assert!(!segments_intersect([0.0, 0.5], [0.0, 1.0], [-1.0, 0.0], [1.0, 0.0]));
    }

    #[test]
    fn test_segment_touching_and_collinear() {
        // T-junction.
        assert!(segments_intersect([0.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [1.0, 0.0]));
        // Collinear overlap.
        assert!(segments_intersect([0.0, 0.0], [2.0, 0.0], [1.0, 0.0], [3.0, 0.0]));
        // Collinear, disjoint.
        assert!(!segments_intersect([0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0]));
        // Parallel.
        assert!(!segments_intersect([0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]));
    }

    #[test]
    fn test_l1_distance() {
        assert_eq!(l1_distance([0.0, 0.0, 0.0], [1.0, -2.0, 3.0]), 6.0);
    }
}
