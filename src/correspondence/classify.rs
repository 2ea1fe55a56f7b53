//! Nine-class segmentation of the regional grid around the site footprint.
//!
//! Generated grids number j along +y, so the `J-` (North) side of the site
//! faces low y and the `I` (West) side faces high x. With `(x0, y0)`–`(x1, y1)`
//! the footprint and `(0, 0)`–`(Lx, Ly)` the domain, the classes are:
//!
//! | class | region |
//! |-------|--------|
//! | 1 | inside the footprint (half-open on each axis) |
//! | 2 | North wedge `(0,0) (x0,y0) (x1,y0) (Lx,0)` |
//! | 3 | West wedge `(Lx,0) (x1,y0) (x1,y1) (Lx,Ly)` |
//! | 4 | South wedge `(Lx,Ly) (x1,y1) (x0,y1) (0,Ly)` |
//! | 5 | East wedge `(0,Ly) (x0,y1) (x0,y0) (0,0)` |
//! | 6 | North-West corner `(x1,0) (x1,y0) (Lx,y0) (Lx,0)` |
//! | 7 | South-West corner `(x1,y1) (x1,Ly) (Lx,Ly) (Lx,y1)` |
//! | 8 | South-East corner `(0,y1) (x0,y1) (x0,Ly) (0,Ly)` |
//! | 9 | anything else |
//!
//! Wedge membership includes the wedge boundary and wedges are tested in
//! order, so cells on a diagonal go to the first wedge that holds them.
//! Cells under the footprint outline but above or below its depth range go
//! to the wedge of the nearest footprint side, ties in the same order.

use super::geometry::{Point2, is_point_inside_polygon};
use crate::grid::Grid;
use crate::types::{Footprint, Side};

/// Class of a regional cell relative to the site footprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum NodeClass {
    /// Under the site.
    Inside = 1,
    /// Wedge facing the `J-` side.
    NorthWedge = 2,
    /// Wedge facing the `I` side.
    WestWedge = 3,
    /// Wedge facing the `J` side.
    SouthWedge = 4,
    /// Wedge facing the `I-` side.
    EastWedge = 5,
    /// Corner between the North and West wedges.
    NorthWestCorner = 6,
    /// Corner between the South and West wedges.
    SouthWestCorner = 7,
    /// Corner between the South and East wedges.
    SouthEastCorner = 8,
    /// Fallback, including the corner between the North and East wedges.
    Other = 9,
}

impl NodeClass {
    /// Numeric tag written to region include files.
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Wedge class facing a side.
    pub fn wedge(side: Side) -> Self {
        match side {
            Side::North => NodeClass::NorthWedge,
            Side::West => NodeClass::WestWedge,
            Side::South => NodeClass::SouthWedge,
            Side::East => NodeClass::EastWedge,
        }
    }

    /// The two corner classes shared by a side.
    pub fn corners(side: Side) -> [Self; 2] {
        match side {
            Side::North => [NodeClass::Other, NodeClass::NorthWestCorner],
            Side::West => [NodeClass::NorthWestCorner, NodeClass::SouthWestCorner],
            Side::South => [NodeClass::SouthWestCorner, NodeClass::SouthEastCorner],
            Side::East => [NodeClass::SouthEastCorner, NodeClass::Other],
        }
    }
}

struct Segmentation {
    polygons: Vec<(NodeClass, [Point2; 4])>,
}

impl Segmentation {
    fn new(domain_min: Point2, domain_max: Point2, footprint: &Footprint) -> Self {
        let [ox, oy] = domain_min;
        let [lx, ly] = domain_max;
        let (x0, y0) = (footprint.min[0], footprint.min[1]);
        let (x1, y1) = (footprint.max[0], footprint.max[1]);
        let polygons = vec![
            (NodeClass::NorthWedge, [[ox, oy], [x0, y0], [x1, y0], [lx, oy]]),
            (NodeClass::WestWedge, [[lx, oy], [x1, y0], [x1, y1], [lx, ly]]),
            (NodeClass::SouthWedge, [[lx, ly], [x1, y1], [x0, y1], [ox, ly]]),
            (NodeClass::EastWedge, [[ox, ly], [x0, y1], [x0, y0], [ox, oy]]),
            (NodeClass::NorthWestCorner, [[x1, oy], [x1, y0], [lx, y0], [lx, oy]]),
            (NodeClass::SouthWestCorner, [[x1, y1], [x1, ly], [lx, ly], [lx, y1]]),
            (NodeClass::SouthEastCorner, [[ox, y1], [x0, y1], [x0, ly], [ox, ly]]),
        ];
        Self { polygons }
    }

    fn classify(&self, footprint: &Footprint, center: [f64; 3]) -> NodeClass {
        if footprint.contains(center[0], center[1], center[2]) {
            return NodeClass::Inside;
        }
        let p = [center[0], center[1]];
        self.polygons
            .iter()
            .find(|(_, poly)| is_point_inside_polygon(p, poly, true))
            .map(|(class, _)| *class)
            .or_else(|| nearest_side_wedge(footprint, p))
            .unwrap_or(NodeClass::Other)
    }
}

/// Wedge of the footprint side nearest to `p`, for points within the
/// footprint outline.
fn nearest_side_wedge(footprint: &Footprint, p: Point2) -> Option<NodeClass> {
    let [x0, y0, _] = footprint.min;
    let [x1, y1, _] = footprint.max;
    if p[0] < x0 || p[0] > x1 || p[1] < y0 || p[1] > y1 {
        return None;
    }
    [
        (Side::North, p[1] - y0),
        (Side::West, x1 - p[0]),
        (Side::South, y1 - p[1]),
        (Side::East, p[0] - x0),
    ]
    .into_iter()
    .min_by(|a, b| a.1.total_cmp(&b.1))
    .map(|(side, _)| NodeClass::wedge(side))
}

/// Assign every regional cell (natural order) to one of the nine classes.
///
/// # Example
///
/// ```
/// use expreccs::correspondence::{NodeClass, classify_regional_cells};
/// use expreccs::grid::{AxisPartition, GridKind, build_grid};
/// use expreccs::types::Footprint;
///
/// let regional = build_grid(
///     GridKind::Regional,
///     [0.0; 3],
///     [10.0, 10.0, 2.0],
///     &[AxisPartition::Uniform(10), AxisPartition::Uniform(10), AxisPartition::Uniform(2)],
/// )
/// .unwrap();
/// let footprint = Footprint::new([3.0, 3.0, 0.0], [7.0, 7.0, 2.0]);
/// let classes = classify_regional_cells(&regional, &footprint);
/// assert_eq!(classes.iter().filter(|c| **c == NodeClass::Inside).count(), 32);
/// assert!(!classes.contains(&NodeClass::Other));
/// ```
pub fn classify_regional_cells(regional: &Grid, footprint: &Footprint) -> Vec<NodeClass> {
    let origin = regional.origin();
    let extents = regional.extents();
    let seg = Segmentation::new(
        [origin[0], origin[1]],
        [origin[0] + extents[0], origin[1] + extents[1]],
        footprint,
    );
    let classify = |c: usize| {
        let [i, j, k] = regional.ijk(c.into());
        seg.classify(footprint, regional.cell_center(i, j, k))
    };

    #[cfg(feature = "parallel")]
    let classes: Vec<NodeClass> = {
        use rayon::prelude::*;
        (0..regional.n_cells()).into_par_iter().map(classify).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let classes: Vec<NodeClass> = (0..regional.n_cells()).map(classify).collect();

    let fallback = classes.iter().filter(|c| **c == NodeClass::Other).count();
    if fallback > 0 {
        tracing::warn!(
            cells = fallback,
            "regional cells matched no wedge and were assigned class 9"
        );
    }
    classes
}

/// Collapse classes into the inside/outside region mask (1 inside, 2 outside).
pub fn inside_mask(classes: &[NodeClass]) -> Vec<i32> {
    classes
        .iter()
        .map(|c| if *c == NodeClass::Inside { 1 } else { 2 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{AxisPartition, GridKind, build_grid};

    fn regional(nx: usize, ny: usize, nz: usize) -> Grid {
        build_grid(
            GridKind::Regional,
            [0.0; 3],
            [nx as f64 * 100.0, ny as f64 * 100.0, nz as f64 * 10.0],
            &[
                AxisPartition::Uniform(nx),
                AxisPartition::Uniform(ny),
                AxisPartition::Uniform(nz),
            ],
        )
        .unwrap()
    }

    fn count(classes: &[NodeClass], class: NodeClass) -> usize {
        classes.iter().filter(|c| **c == class).count()
    }

    #[test]
    fn test_centered_footprint() {
        let g = regional(10, 10, 2);
        let f = Footprint::new([300.0, 300.0, 0.0], [700.0, 700.0, 20.0]);
        let classes = classify_regional_cells(&g, &f);
        assert_eq!(classes.len(), 200);
        for k in 0..2 {
            let layer = &classes[k * 100..(k + 1) * 100];
            assert_eq!(count(layer, NodeClass::Inside), 16);
        }
        assert_eq!(count(&classes, NodeClass::Other), 0);
        // Diagonal cells go to the wedge tested first.
        assert_eq!(count(&classes, NodeClass::NorthWedge), 48);
        assert_eq!(count(&classes, NodeClass::WestWedge), 42);
        assert_eq!(count(&classes, NodeClass::SouthWedge), 42);
        assert_eq!(count(&classes, NodeClass::EastWedge), 36);
    }

    #[test]
    fn test_wedges_by_position() {
        let g = regional(10, 10, 1);
        let f = Footprint::new([300.0, 300.0, 0.0], [700.0, 700.0, 10.0]);
        let classes = classify_regional_cells(&g, &f);
        assert_eq!(classes[g.index(5, 0, 0).get()], NodeClass::NorthWedge);
        assert_eq!(classes[g.index(9, 5, 0).get()], NodeClass::WestWedge);
        assert_eq!(classes[g.index(5, 9, 0).get()], NodeClass::SouthWedge);
        assert_eq!(classes[g.index(0, 5, 0).get()], NodeClass::EastWedge);
        assert_eq!(classes[g.index(5, 5, 0).get()], NodeClass::Inside);
        // Diagonal cell belongs to the first wedge tested.
        assert_eq!(classes[g.index(0, 0, 0).get()], NodeClass::NorthWedge);
        assert_eq!(classes[g.index(9, 9, 0).get()], NodeClass::WestWedge);
    }

    #[test]
    fn test_every_cell_classified_once() {
        let g = regional(13, 7, 3);
        let f = Footprint::new([250.0, 150.0, 0.0], [850.0, 450.0, 30.0]);
        let classes = classify_regional_cells(&g, &f);
        assert_eq!(classes.len(), g.n_cells());
        assert!(count(&classes, NodeClass::Inside) > 0);
        assert_eq!(count(&classes, NodeClass::Other), 0);
    }

    #[test]
    fn test_partial_depth_footprint_uses_nearest_side() {
        let g = regional(10, 10, 2);
        let f = Footprint::new([300.0, 300.0, 0.0], [700.0, 700.0, 10.0]);
        let classes = classify_regional_cells(&g, &f);
        assert_eq!(count(&classes, NodeClass::Inside), 16);
        assert_eq!(count(&classes, NodeClass::Other), 0);
        // Layer 0 as for a full-depth footprint, plus the 16 cells below it.
        assert_eq!(count(&classes, NodeClass::NorthWedge), 48 + 6);
        assert_eq!(count(&classes, NodeClass::WestWedge), 42 + 4);
        assert_eq!(count(&classes, NodeClass::SouthWedge), 42 + 4);
        assert_eq!(count(&classes, NodeClass::EastWedge), 36 + 2);
        // Below the footprint, next to its I- side.
        assert_eq!(classes[g.index(3, 5, 1).get()], NodeClass::EastWedge);
        assert_eq!(classes[g.index(5, 6, 1).get()], NodeClass::SouthWedge);
        assert_eq!(classes[g.index(3, 3, 1).get()], NodeClass::NorthWedge);
    }

    #[test]
    fn test_inside_mask() {
        let mask = inside_mask(&[NodeClass::Inside, NodeClass::EastWedge, NodeClass::Other]);
        assert_eq!(mask, vec![1, 2, 2]);
        assert_eq!(NodeClass::SouthEastCorner.value(), 8);
    }
}
