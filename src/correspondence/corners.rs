//! Site corners in the regional grid and co-generated boundary face sets.

use super::NodeClass;
use crate::grid::{Grid, GridError, RefinementRatio};
use crate::types::{CellIndex, FaceId, Side, SideBoundaries};

/// Inclusive `(i, j, k)` box of regional cells under the site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SiteCorners {
    /// Lowest `(i, j, k)`.
    pub min: [usize; 3],
    /// Highest `(i, j, k)`.
    pub max: [usize; 3],
}

impl SiteCorners {
    /// Cells along each axis.
    pub fn counts(&self) -> [usize; 3] {
        [
            self.max[0] - self.min[0] + 1,
            self.max[1] - self.min[1] + 1,
            self.max[2] - self.min[2] + 1,
        ]
    }

    /// True if `(i, j, k)` lies in the box.
    pub fn contains(&self, i: usize, j: usize, k: usize) -> bool {
        let p = [i, j, k];
        (0..3).all(|d| p[d] >= self.min[d] && p[d] <= self.max[d])
    }

    /// Fail unless the box leaves at least one regional cell on every lateral
    /// side, which flux and pressure stencils read.
    pub fn require_interior(&self, dims: [usize; 3]) -> Result<(), GridError> {
        let checks = [
            (Side::North, self.min[1] == 0),
            (Side::West, self.max[0] + 1 >= dims[0]),
            (Side::South, self.max[1] + 1 >= dims[1]),
            (Side::East, self.min[0] == 0),
        ];
        for (side, touches) in checks {
            if touches {
                return Err(GridError::FootprintTouchesDomainEdge { side });
            }
        }
        Ok(())
    }
}

/// Minimal `(i, j, k)` box enclosing all class-1 cells.
///
/// Fails with [`GridError::EmptyFootprint`] when there is none.
pub fn find_site_corners(classes: &[NodeClass], dims: [usize; 3]) -> Result<SiteCorners, GridError> {
    let [nx, ny, _] = dims;
    let mut corners: Option<SiteCorners> = None;
    for (c, class) in classes.iter().enumerate() {
        if *class != NodeClass::Inside {
            continue;
        }
        let p = [c % nx, (c / nx) % ny, c / (nx * ny)];
        corners = Some(match corners {
            None => SiteCorners { min: p, max: p },
            Some(mut b) => {
                for d in 0..3 {
                    b.min[d] = b.min[d].min(p[d]);
                    b.max[d] = b.max[d].max(p[d]);
                }
                b
            }
        });
    }
    corners.ok_or(GridError::EmptyFootprint)
}

/// One site boundary face and its regional counterpart.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryFace {
    /// Face id, unique across all sides.
    pub id: FaceId,
    /// Site cell owning the face.
    pub site_cell: [usize; 3],
    /// Corresponding regional cell, if any.
    pub regional_cell: Option<CellIndex>,
    /// Face centroid.
    pub centroid: [f64; 3],
    /// Region tag restricting the correspondence, if zones are used.
    pub zone: Option<i32>,
}

/// Ordered faces of one site side.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryFaceSet {
    /// The side.
    pub side: Side,
    /// Faces, layer-major.
    pub faces: Vec<BoundaryFace>,
}

impl BoundaryFaceSet {
    /// Whether the side has any matching face at all.
    pub fn is_active(&self) -> bool {
        self.faces.iter().any(|f| f.regional_cell.is_some())
    }

    /// Number of faces.
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// True when the side has no faces.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// `(i, j)` of the site cells along a side, in ascending order along it.
pub fn side_cells(side: Side, nx: usize, ny: usize) -> Vec<(usize, usize)> {
    match side {
        Side::North => (0..nx).map(|i| (i, 0)).collect(),
        Side::South => (0..nx).map(|i| (i, ny - 1)).collect(),
        Side::West => (0..ny).map(|j| (nx - 1, j)).collect(),
        Side::East => (0..ny).map(|j| (0, j)).collect(),
    }
}

/// Boundary faces of a generated site grid, matched by index to the regional
/// cells under the site.
///
/// Faces are numbered across sides in the order North, West, South, East and
/// layer-major within a side. Centroids include the site rotation.
pub fn conforming_face_sets(
    site: &Grid,
    regional: &Grid,
    corners: &SiteCorners,
    ratio: &RefinementRatio,
) -> Result<SideBoundaries<BoundaryFaceSet>, GridError> {
    let [nx, ny, nz] = site.dims();
    let counts = corners.counts();
    let expected = [counts[0] * ratio.x, counts[1] * ratio.y, counts[2] * ratio.z];
    if expected != [nx, ny, nz] {
        return Err(GridError::Geometry(format!(
            "site grid {:?} does not refine the regional cells under it ({:?} x {:?})",
            [nx, ny, nz],
            counts,
            ratio
        )));
    }

    let mut next_id = 0;
    let sets = SideBoundaries::from_fn(|side| {
        let cells = side_cells(side, nx, ny);
        let mut faces = Vec::with_capacity(cells.len() * nz);
        for k in 0..nz {
            for &(i, j) in &cells {
                let [x, y, z] = site.cell_center(i, j, k);
                let [dx, dy, _] = site.cell_size(i, j, k);
                let (fx, fy) = match side {
                    Side::North => (x, y - 0.5 * dy),
                    Side::South => (x, y + 0.5 * dy),
                    Side::West => (x + 0.5 * dx, y),
                    Side::East => (x - 0.5 * dx, y),
                };
                let (fx, fy) = match site.rotation() {
                    Some(rot) => rot.apply(fx, fy),
                    None => (fx, fy),
                };
                let regional_cell = regional.index(
                    corners.min[0] + i / ratio.x,
                    corners.min[1] + j / ratio.y,
                    corners.min[2] + k / ratio.z,
                );
                faces.push(BoundaryFace {
                    id: FaceId::new(next_id),
                    site_cell: [i, j, k],
                    regional_cell: Some(regional_cell),
                    centroid: [fx, fy, z],
                    zone: None,
                });
                next_id += 1;
            }
        }
        BoundaryFaceSet { side, faces }
    });
    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::classify_regional_cells;
    use crate::grid::{AxisPartition, NestedGridSpec, NestedGrids};
    use crate::types::Footprint;

    fn grids() -> NestedGrids {
        NestedGrids::derive(&NestedGridSpec {
            regional_dims: [1000.0, 1000.0, 20.0],
            regional_partitions: [
                AxisPartition::Uniform(10),
                AxisPartition::Uniform(10),
                AxisPartition::Uniform(2),
            ],
            footprint: Footprint::new([300.0, 400.0, 0.0], [700.0, 700.0, 20.0]),
            site_cells: [8, 6, 2],
            rotation_deg: None,
        })
        .unwrap()
    }

    #[test]
    fn test_find_site_corners() {
        let g = grids();
        let classes = classify_regional_cells(&g.regional, &g.footprint);
        let corners = find_site_corners(&classes, g.regional.dims()).unwrap();
        assert_eq!(corners.min, [3, 4, 0]);
        assert_eq!(corners.max, [6, 6, 1]);
        assert_eq!(corners.counts(), [4, 3, 2]);
        assert!(corners.require_interior(g.regional.dims()).is_ok());
    }

    #[test]
    fn test_no_inside_cells_is_an_error() {
        let classes = vec![NodeClass::NorthWedge; 8];
        assert!(matches!(
            find_site_corners(&classes, [2, 2, 2]),
            Err(GridError::EmptyFootprint)
        ));
    }

    #[test]
    fn test_footprint_on_domain_edge() {
        let corners = SiteCorners {
            min: [0, 2, 0],
            max: [3, 4, 0],
        };
        assert!(matches!(
            corners.require_interior([10, 10, 1]),
            Err(GridError::FootprintTouchesDomainEdge { side: Side::East })
        ));
    }

    #[test]
    fn test_conforming_faces() {
        let g = grids();
        let classes = classify_regional_cells(&g.regional, &g.footprint);
        let corners = find_site_corners(&classes, g.regional.dims()).unwrap();
        let sets = conforming_face_sets(&g.site, &g.regional, &corners, &g.ratio).unwrap();

        assert_eq!(sets.north.len(), 8 * 2);
        assert_eq!(sets.west.len(), 6 * 2);
        assert!(sets.iter().all(|(_, s)| s.is_active()));

        // Ids run across sides.
        assert_eq!(sets.north.faces[0].id.get(), 0);
        assert_eq!(sets.west.faces[0].id.get(), 16);
        assert_eq!(sets.east.faces.last().unwrap().id.get(), 16 + 12 + 16 + 11);

        let f = &sets.north.faces[3];
        assert_eq!(f.centroid, [475.0, 400.0, 5.0]);
        assert_eq!(f.regional_cell, Some(g.regional.index(4, 4, 0)));

        let w = &sets.west.faces[7];
        assert_eq!(w.site_cell, [7, 1, 1]);
        assert_eq!(w.centroid, [700.0, 475.0, 15.0]);
        assert_eq!(w.regional_cell, Some(g.regional.index(6, 4, 1)));
    }
}
