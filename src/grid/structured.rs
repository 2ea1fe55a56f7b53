//! Structured cuboid grids generated from axis partitions.

use std::fmt;

use super::{Axis, AxisPartition, GridError, SiteRotation};
use crate::types::CellIndex;

/// Which model a grid discretizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GridKind {
    /// Whole domain at site resolution.
    Reference,
    /// Whole domain at coarse resolution.
    Regional,
    /// Site footprint at fine resolution.
    Site,
}

impl GridKind {
    /// Lowercase name used for folders and logs.
    pub fn name(self) -> &'static str {
        match self {
            GridKind::Reference => "reference",
            GridKind::Regional => "regional",
            GridKind::Site => "site",
        }
    }
}

impl fmt::Display for GridKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Axis-aligned structured grid with natural cell ordering
/// `i + j*nx + k*nx*ny`.
#[derive(Clone, Debug)]
pub struct Grid {
    kind: GridKind,
    axes: [Axis; 3],
    rotation: Option<SiteRotation>,
}

/// Build a grid spanning `origin .. origin + dims` from one partition per axis.
///
/// # Example
///
/// ```
/// use expreccs::grid::{AxisPartition, GridKind, build_grid};
///
/// let grid = build_grid(
///     GridKind::Regional,
///     [0.0, 0.0, 0.0],
///     [1000.0, 1000.0, 50.0],
///     &[AxisPartition::Uniform(10), AxisPartition::Uniform(10), AxisPartition::Uniform(2)],
/// )
/// .unwrap();
/// assert_eq!(grid.dims(), [10, 10, 2]);
/// assert_eq!(grid.n_cells(), 200);
/// ```
pub fn build_grid(
    kind: GridKind,
    origin: [f64; 3],
    dims: [f64; 3],
    partitions: &[AxisPartition; 3],
) -> Result<Grid, GridError> {
    let x = Axis::build('x', origin[0], dims[0], &partitions[0])?;
    let y = Axis::build('y', origin[1], dims[1], &partitions[1])?;
    let z = Axis::build('z', origin[2], dims[2], &partitions[2])?;
    Ok(Grid::from_axes(kind, [x, y, z]))
}

impl Grid {
    /// Assemble a grid from prebuilt axes.
    pub fn from_axes(kind: GridKind, axes: [Axis; 3]) -> Self {
        Self {
            kind,
            axes,
            rotation: None,
        }
    }

    /// Attach a horizontal rotation.
    pub fn with_rotation(mut self, rotation: SiteRotation) -> Self {
        self.rotation = (!rotation.is_identity()).then_some(rotation);
        self
    }

    /// Grid kind.
    pub fn kind(&self) -> GridKind {
        self.kind
    }

    /// Attached rotation, if any.
    pub fn rotation(&self) -> Option<&SiteRotation> {
        self.rotation.as_ref()
    }

    /// Axis `d` (0 = x, 1 = y, 2 = z).
    pub fn axis(&self, d: usize) -> &Axis {
        &self.axes[d]
    }

    /// The x axis.
    pub fn x(&self) -> &Axis {
        &self.axes[0]
    }

    /// The y axis.
    pub fn y(&self) -> &Axis {
        &self.axes[1]
    }

    /// The z axis.
    pub fn z(&self) -> &Axis {
        &self.axes[2]
    }

    /// Cell counts `[nx, ny, nz]`.
    pub fn dims(&self) -> [usize; 3] {
        [
            self.axes[0].n_cells(),
            self.axes[1].n_cells(),
            self.axes[2].n_cells(),
        ]
    }

    /// Total number of cells.
    pub fn n_cells(&self) -> usize {
        let [nx, ny, nz] = self.dims();
        nx * ny * nz
    }

    /// Physical lower corner.
    pub fn origin(&self) -> [f64; 3] {
        [self.x().start(), self.y().start(), self.z().start()]
    }

    /// Physical extents per axis.
    pub fn extents(&self) -> [f64; 3] {
        [
            self.x().end() - self.x().start(),
            self.y().end() - self.y().start(),
            self.z().end() - self.z().start(),
        ]
    }

    /// Natural-order index of `(i, j, k)`.
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> CellIndex {
        let [nx, ny, _] = self.dims();
        CellIndex::new(i + j * nx + k * nx * ny)
    }

    /// `(i, j, k)` of a natural-order index.
    #[inline]
    pub fn ijk(&self, cell: CellIndex) -> [usize; 3] {
        let [nx, ny, _] = self.dims();
        let c = cell.get();
        [c % nx, (c / nx) % ny, c / (nx * ny)]
    }

    /// Unrotated cell center.
    pub fn cell_center(&self, i: usize, j: usize, k: usize) -> [f64; 3] {
        [
            self.x().midpoints()[i],
            self.y().midpoints()[j],
            self.z().midpoints()[k],
        ]
    }

    /// Cell center with the grid rotation applied.
    pub fn rotated_center(&self, i: usize, j: usize, k: usize) -> [f64; 3] {
        let [x, y, z] = self.cell_center(i, j, k);
        match &self.rotation {
            Some(rot) => {
                let (xr, yr) = rot.apply(x, y);
                [xr, yr, z]
            }
            None => [x, y, z],
        }
    }

    /// Cell sizes `(dx, dy, dz)`.
    pub fn cell_size(&self, i: usize, j: usize, k: usize) -> [f64; 3] {
        [
            self.x().sizes()[i],
            self.y().sizes()[j],
            self.z().sizes()[k],
        ]
    }

    /// Horizontal node coordinates, `(nx + 1) * (ny + 1)` pairs with i fastest,
    /// rotated when the grid carries a rotation.
    pub fn rotated_nodes(&self) -> Vec<[f64; 2]> {
        let mut nodes = Vec::with_capacity(self.x().edges().len() * self.y().edges().len());
        for &y in self.y().edges() {
            for &x in self.x().edges() {
                let (xr, yr) = match &self.rotation {
                    Some(rot) => rot.apply(x, y),
                    None => (x, y),
                };
                nodes.push([xr, yr]);
            }
        }
        nodes
    }

    /// `(i, j, k)` of the cell holding a physical point, by nearest midpoint
    /// per axis. `None` outside the domain.
    pub fn locate(&self, point: [f64; 3]) -> Option<[usize; 3]> {
        for d in 0..3 {
            if point[d] < self.axes[d].start() || point[d] > self.axes[d].end() {
                return None;
            }
        }
        Some([
            self.x().nearest_cell(point[0]),
            self.y().nearest_cell(point[1]),
            self.z().nearest_cell(point[2]),
        ])
    }

    /// One-based rock region per layer.
    ///
    /// `region_thicknesses` lists the thickness of each rock region from the
    /// top; a layer belongs to the region holding its midpoint. Layers below
    /// the last region stay in the last region.
    pub fn layer_regions(&self, region_thicknesses: &[f64]) -> Vec<usize> {
        let top = self.z().start();
        let mut bounds = Vec::with_capacity(region_thicknesses.len());
        let mut acc = top;
        for t in region_thicknesses {
            acc += t;
            bounds.push(acc);
        }
        self.z()
            .midpoints()
            .iter()
            .map(|m| {
                let pos = bounds.partition_point(|b| b < m);
                pos.min(bounds.len().saturating_sub(1)) + 1
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        build_grid(
            GridKind::Regional,
            [0.0, 0.0, 1000.0],
            [100.0, 50.0, 30.0],
            &[
                AxisPartition::Uniform(10),
                AxisPartition::Uniform(5),
                AxisPartition::Uniform(3),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_index_round_trip() {
        let g = grid();
        for cell in CellIndex::iter(g.n_cells()) {
            let [i, j, k] = g.ijk(cell);
            assert_eq!(g.index(i, j, k), cell);
        }
        assert_eq!(g.index(3, 2, 1).get(), 3 + 2 * 10 + 50);
    }

    #[test]
    fn test_centers_and_sizes() {
        let g = grid();
        assert_eq!(g.cell_center(0, 0, 0), [5.0, 5.0, 1005.0]);
        assert_eq!(g.cell_size(9, 4, 2), [10.0, 10.0, 10.0]);
        assert_eq!(g.origin(), [0.0, 0.0, 1000.0]);
        assert_eq!(g.extents(), [100.0, 50.0, 30.0]);
    }

    #[test]
    fn test_locate() {
        let g = grid();
        assert_eq!(g.locate([55.0, 12.0, 1021.0]), Some([5, 1, 2]));
        assert_eq!(g.locate([-1.0, 12.0, 1021.0]), None);
    }

    #[test]
    fn test_layer_regions() {
        let g = grid();
        assert_eq!(g.layer_regions(&[10.0, 20.0]), vec![1, 2, 2]);
        assert_eq!(g.layer_regions(&[25.0]), vec![1, 1, 1]);
    }

    #[test]
    fn test_rotated_nodes() {
        let g = grid().with_rotation(SiteRotation::new(90.0, (0.0, 0.0)));
        let nodes = g.rotated_nodes();
        assert_eq!(nodes.len(), 11 * 6);
        let last = nodes[10];
        assert!((last[0] - 0.0).abs() < 1e-9 && (last[1] - 100.0).abs() < 1e-9);
        let [x, y, _] = g.rotated_center(0, 0, 0);
        assert!((x + 5.0).abs() < 1e-9 && (y - 5.0).abs() < 1e-9);
    }
}
