//! Geometric matching of site boundary faces to independently built regional grids.
//!
//! Each site face is paired with the L1-nearest active regional cell. The
//! pairing is kept only if a short segment through that cell, along the
//! boundary-normal axis, crosses the site border line; otherwise the regional
//! cell does not sit on the boundary and the face gets no condition. Kept
//! cells and their neighbours form the interpolation support.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::BoundaryFaceSet;
use super::geometry::{Point2, segments_intersect};
use super::spatial::PointIndex;
use crate::grid::CornerPointGrid;
use crate::types::{CellIndex, Side};

/// Vertical offset magnitude applied to neighbour support points.
pub const SUPPORT_JITTER: f64 = 1e-4;

/// Deterministic z-offset for a neighbour support point.
///
/// Alternates between two magnitudes by cell parity so that stacked support
/// points never share an exact coordinate.
pub fn support_jitter(cell: CellIndex) -> f64 {
    -SUPPORT_JITTER * (1.0 + (cell.get() % 2) as f64) / 2.0
}

/// How matching treats region tags and the vertical axis.
#[derive(Clone, Debug, Default)]
pub struct MatchOptions<'a> {
    /// Regional region tag per cell (natural order); faces only match cells
    /// whose tag equals the face's zone.
    pub regional_zones: Option<&'a [i32]>,
    /// Use 3D support points (jittered in z) instead of 2D.
    pub vertical: bool,
}

/// A regional cell used as an interpolation node.
#[derive(Clone, Debug, PartialEq)]
pub struct SupportPoint {
    /// Regional cell.
    pub cell: CellIndex,
    /// Node position (z jittered for neighbours in 3D mode).
    pub position: [f64; 3],
    /// Region tag of the cell, if zones are used.
    pub zone: Option<i32>,
}

/// Result of matching one side.
#[derive(Clone, Debug)]
pub struct SideMatch {
    /// Faces with `regional_cell` filled in for kept correspondences.
    pub faces: BoundaryFaceSet,
    /// Interpolation support.
    pub support: Vec<SupportPoint>,
    /// Cells matched directly by a face.
    pub matched: BTreeSet<CellIndex>,
    /// Neighbours added for support only.
    pub neighbours: BTreeSet<CellIndex>,
}

impl SideMatch {
    /// Number of faces with a correspondence.
    pub fn n_kept(&self) -> usize {
        self.faces
            .faces
            .iter()
            .filter(|f| f.regional_cell.is_some())
            .count()
    }
}

/// Border segment of a side on the site outline
/// `[(0,0), (nx,0), (nx,ny), (0,ny)]`.
pub fn border_segment(side: Side, outline: &[Point2; 4]) -> (Point2, Point2) {
    match side {
        Side::North => (outline[0], outline[1]),
        Side::West => (outline[1], outline[2]),
        Side::South => (outline[2], outline[3]),
        Side::East => (outline[3], outline[0]),
    }
}

fn xy(p: [f64; 3]) -> Point2 {
    [p[0], p[1]]
}

/// Active regional cells indexed for nearest-cell queries, overall and per
/// region tag.
struct CellLocator {
    all: PointIndex,
    by_zone: BTreeMap<i32, PointIndex>,
}

impl CellLocator {
    fn new(regional: &CornerPointGrid, zones: Option<&[i32]>) -> Self {
        let active = regional.active_cells();
        let all = PointIndex::new(active.iter().map(|c| (regional.center(*c), c.get())));
        let mut by_zone = BTreeMap::new();
        if let Some(tags) = zones {
            let mut groups: BTreeMap<i32, Vec<([f64; 3], usize)>> = BTreeMap::new();
            for cell in active {
                groups
                    .entry(tags[cell.get()])
                    .or_default()
                    .push((regional.center(*cell), cell.get()));
            }
            by_zone = groups
                .into_iter()
                .map(|(zone, points)| (zone, PointIndex::new(points)))
                .collect();
        }
        Self { all, by_zone }
    }

    /// Nearest active cell by L1 distance, restricted to `zone` when region
    /// tags are in use.
    fn nearest(&self, target: [f64; 3], zone: Option<i32>, zoned: bool) -> Option<CellIndex> {
        let index = match zone {
            Some(z) if zoned => self.by_zone.get(&z)?,
            _ => &self.all,
        };
        index.nearest_l1(target).map(CellIndex::new)
    }
}

/// Segment through `cell` along the boundary-normal axis, using whichever
/// active neighbours exist.
fn normal_segment(regional: &CornerPointGrid, cell: CellIndex, side: Side) -> Option<(Point2, Point2)> {
    let (di, dj) = if side.is_i_face() { (1, 0) } else { (0, 1) };
    let active = |c: Option<CellIndex>| c.filter(|c| regional.is_active(*c));
    let minus = active(regional.offset(cell, -di, -dj, 0));
    let plus = active(regional.offset(cell, di, dj, 0));
    let mid = xy(regional.center(cell));
    match (minus, plus) {
        (Some(m), Some(p)) => Some((xy(regional.center(m)), xy(regional.center(p)))),
        (None, Some(p)) => Some((mid, xy(regional.center(p)))),
        (Some(m), None) => Some((xy(regional.center(m)), mid)),
        (None, None) => None,
    }
}

/// Match the faces of one side against a regional grid.
///
/// Faces without a correspondence keep `regional_cell = None`.
pub fn match_boundary(
    mut faces: BoundaryFaceSet,
    regional: &CornerPointGrid,
    border: (Point2, Point2),
    options: &MatchOptions<'_>,
) -> SideMatch {
    let side = faces.side;
    let mut matched = BTreeSet::new();
    let mut neighbours = BTreeSet::new();
    let mut support = Vec::new();
    let mut in_support: HashMap<CellIndex, usize> = HashMap::new();
    let zone_of = |c: CellIndex| options.regional_zones.map(|z| z[c.get()]);
    let locator = CellLocator::new(regional, options.regional_zones);
    let zoned = options.regional_zones.is_some();

    let mut push = |cell: CellIndex, jitter: f64, support: &mut Vec<SupportPoint>| {
        if in_support.contains_key(&cell) {
            return;
        }
        let mut position = regional.center(cell);
        if options.vertical {
            position[2] += jitter;
        }
        in_support.insert(cell, support.len());
        support.push(SupportPoint {
            cell,
            position,
            zone: zone_of(cell),
        });
    };

    for face in faces.faces.iter_mut() {
        face.regional_cell = None;
        let Some(cell) = locator.nearest(face.centroid, face.zone, zoned) else {
            tracing::trace!(face = %face.id, "no regional cell in zone");
            continue;
        };
        let crosses = normal_segment(regional, cell, side)
            .is_some_and(|(a, b)| segments_intersect(a, b, border.0, border.1));
        if !crosses {
            tracing::trace!(face = %face.id, %cell, "nearest regional cell is off the border");
            continue;
        }
        face.regional_cell = Some(cell);
        matched.insert(cell);
        push(cell, 0.0, &mut support);

        for (di, dj, dk) in [
            (1, 0, 0),
            (-1, 0, 0),
            (0, 1, 0),
            (0, -1, 0),
            (0, 0, 1),
            (0, 0, -1),
        ] {
            let Some(n) = regional.offset(cell, di, dj, dk) else {
                continue;
            };
            if !regional.is_active(n) {
                continue;
            }
            if let (Some(tags), Some(z)) = (options.regional_zones, face.zone) {
                if tags[n.get()] != z {
                    continue;
                }
            }
            push(n, support_jitter(n), &mut support);
            neighbours.insert(n);
        }
    }
    neighbours.retain(|c| !matched.contains(c));

    let result = SideMatch {
        faces,
        support,
        matched,
        neighbours,
    };
    tracing::debug!(
        %side,
        kept = result.n_kept(),
        faces = result.faces.len(),
        support = result.support.len(),
        "matched site boundary"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::BoundaryFace;
    use crate::grid::{AxisPartition, GridKind, build_grid};
    use crate::types::FaceId;

    fn regional() -> CornerPointGrid {
        let g = build_grid(
            GridKind::Regional,
            [0.0; 3],
            [1000.0, 1000.0, 20.0],
            &[
                AxisPartition::Uniform(10),
                AxisPartition::Uniform(10),
                AxisPartition::Uniform(2),
            ],
        )
        .unwrap();
        CornerPointGrid::from_structured(&g)
    }

    fn face(id: usize, centroid: [f64; 3]) -> BoundaryFace {
        BoundaryFace {
            id: FaceId::new(id),
            site_cell: [0, 0, 0],
            regional_cell: None,
            centroid,
            zone: None,
        }
    }

    const OUTLINE: [Point2; 4] = [[300.0, 300.0], [700.0, 300.0], [700.0, 700.0], [300.0, 700.0]];

    #[test]
    fn test_faces_on_border_are_kept() {
        let r = regional();
        let faces = BoundaryFaceSet {
            side: Side::North,
            faces: vec![face(0, [425.0, 300.0, 5.0]), face(1, [575.0, 300.0, 15.0])],
        };
        let border = border_segment(Side::North, &OUTLINE);
        let m = match_boundary(faces, &r, border, &MatchOptions::default());
        assert_eq!(m.n_kept(), 2);
        // Nearest to (425, 300, 5) is the cell centered at (450, 250, 5) or (450, 350, 5);
        // the first in natural order wins.
        assert_eq!(m.faces.faces[0].regional_cell, Some(r.index(4, 2, 0)));
        assert!(m.matched.contains(&r.index(4, 2, 0)));
        assert!(m.neighbours.contains(&r.index(4, 3, 0)));
        assert!(!m.neighbours.contains(&r.index(4, 2, 0)));
    }

    #[test]
    fn test_face_far_from_border_is_dropped() {
        let r = regional();
        let faces = BoundaryFaceSet {
            side: Side::North,
            faces: vec![face(0, [450.0, 550.0, 5.0])],
        };
        let border = border_segment(Side::North, &OUTLINE);
        let m = match_boundary(faces, &r, border, &MatchOptions::default());
        assert_eq!(m.n_kept(), 0);
        assert!(!m.faces.is_active());
        assert!(m.support.is_empty());
    }

    #[test]
    fn test_zones_restrict_nearest_cell() {
        let r = regional();
        // Left half zone 1, right half zone 2.
        let zones: Vec<i32> = (0..r.n_cells())
            .map(|c| if r.ijk(CellIndex::new(c))[0] < 5 { 1 } else { 2 })
            .collect();
        let mut f = face(0, [490.0, 300.0, 5.0]);
        f.zone = Some(2);
        let faces = BoundaryFaceSet {
            side: Side::North,
            faces: vec![f],
        };
        let options = MatchOptions {
            regional_zones: Some(&zones),
            vertical: true,
        };
        let m = match_boundary(faces, &r, border_segment(Side::North, &OUTLINE), &options);
        let cell = m.faces.faces[0].regional_cell.unwrap();
        assert_eq!(r.ijk(cell)[0], 5);
        assert!(m.support.iter().all(|s| s.zone == Some(2)));
    }

    #[test]
    fn test_jitter_is_deterministic() {
        assert_eq!(support_jitter(CellIndex::new(4)), -0.5e-4);
        assert_eq!(support_jitter(CellIndex::new(5)), -1e-4);
        let r = regional();
        let faces = BoundaryFaceSet {
            side: Side::West,
            faces: vec![face(0, [700.0, 450.0, 5.0])],
        };
        let options = MatchOptions {
            regional_zones: None,
            vertical: true,
        };
        let a = match_boundary(faces.clone(), &r, border_segment(Side::West, &OUTLINE), &options);
        let b = match_boundary(faces, &r, border_segment(Side::West, &OUTLINE), &options);
        assert_eq!(a.support, b.support);
        assert!(a.support.iter().skip(1).all(|s| s.position[2] != r.center(s.cell)[2]));
    }
}
