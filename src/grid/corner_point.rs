//! Corner-point grids as stored in `EGRID` files.
//!
//! Geometry is given by `COORD` pillars (six values per pillar, top and
//! bottom point) and `ZCORN` corner depths (eight per cell). A cell corner
//! lies on its pillar at the corner's depth.

use super::{Grid, GridError};
use crate::types::{ActiveIndex, CellIndex};

/// Corner-point grid with precomputed centers and active mapping.
#[derive(Clone, Debug)]
pub struct CornerPointGrid {
    dims: [usize; 3],
    coord: Vec<f64>,
    zcorn: Vec<f64>,
    centers: Vec<[f64; 3]>,
    active: Vec<Option<ActiveIndex>>,
    active_cells: Vec<CellIndex>,
}

impl CornerPointGrid {
    /// Build from raw `GRIDHEAD` dims, `COORD`, `ZCORN` and optional `ACTNUM`.
    pub fn from_arrays(
        dims: [usize; 3],
        coord: Vec<f64>,
        zcorn: Vec<f64>,
        actnum: Option<&[i32]>,
    ) -> Result<Self, GridError> {
        let [nx, ny, nz] = dims;
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(GridError::Geometry(format!("empty grid dimensions {:?}", dims)));
        }
        let n_cells = nx * ny * nz;
        if coord.len() != 6 * (nx + 1) * (ny + 1) {
            return Err(GridError::Geometry(format!(
                "COORD has {} values, expected {}",
                coord.len(),
                6 * (nx + 1) * (ny + 1)
            )));
        }
        if zcorn.len() != 8 * n_cells {
            return Err(GridError::Geometry(format!(
                "ZCORN has {} values, expected {}",
                zcorn.len(),
                8 * n_cells
            )));
        }
        if let Some(a) = actnum {
            if a.len() != n_cells {
                return Err(GridError::Geometry(format!(
                    "ACTNUM has {} values, expected {}",
                    a.len(),
                    n_cells
                )));
            }
        }

        Ok(Self::assemble(dims, coord, zcorn, actnum))
    }

    fn assemble(dims: [usize; 3], coord: Vec<f64>, zcorn: Vec<f64>, actnum: Option<&[i32]>) -> Self {
        let n_cells = dims[0] * dims[1] * dims[2];
        let mut grid = Self {
            dims,
            coord,
            zcorn,
            centers: Vec::with_capacity(n_cells),
            active: Vec::with_capacity(n_cells),
            active_cells: Vec::new(),
        };
        for c in 0..n_cells {
            let cell = CellIndex::new(c);
            let [i, j, k] = grid.ijk(cell);
            let mut center = [0.0; 3];
            for corner in 0..8 {
                let p = grid.corner(i, j, k, corner);
                for d in 0..3 {
                    center[d] += p[d] / 8.0;
                }
            }
            grid.centers.push(center);
            if actnum.is_none_or(|a| a[c] > 0) {
                grid.active.push(Some(ActiveIndex::new(grid.active_cells.len())));
                grid.active_cells.push(cell);
            } else {
                grid.active.push(None);
            }
        }
        grid
    }

    /// Corner-point representation of a structured grid (all cells active).
    ///
    /// Rotated grids keep their rotation in the pillars.
    pub fn from_structured(grid: &Grid) -> Self {
        let [nx, ny, nz] = grid.dims();
        let nodes = grid.rotated_nodes();
        let (top, bottom) = (grid.z().start(), grid.z().end());
        let mut coord = Vec::with_capacity(6 * nodes.len());
        for [x, y] in &nodes {
            coord.extend_from_slice(&[*x, *y, top, *x, *y, bottom]);
        }
        let mut zcorn = vec![0.0; 8 * nx * ny * nz];
        let edges = grid.z().edges();
        for k in 0..nz {
            for t in 0..2 {
                let z = edges[k + t];
                for j in 0..ny {
                    for jj in 0..2 {
                        for i in 0..nx {
                            for ii in 0..2 {
                                zcorn[zcorn_index(nx, ny, i, j, k, ii, jj, t)] = z;
                            }
                        }
                    }
                }
            }
        }
        Self::assemble([nx, ny, nz], coord, zcorn, None)
    }

    /// Cell counts `[nx, ny, nz]`.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Raw `COORD` pillars.
    pub fn coord(&self) -> &[f64] {
        &self.coord
    }

    /// Raw `ZCORN` depths.
    pub fn zcorn(&self) -> &[f64] {
        &self.zcorn
    }

    /// `ACTNUM` flags (1 active, 0 inactive).
    pub fn actnum(&self) -> Vec<i32> {
        self.active.iter().map(|a| i32::from(a.is_some())).collect()
    }

    /// Total number of cells.
    pub fn n_cells(&self) -> usize {
        self.centers.len()
    }

    /// Number of active cells.
    pub fn n_active(&self) -> usize {
        self.active_cells.len()
    }

    /// Natural-order index of `(i, j, k)`.
    pub fn index(&self, i: usize, j: usize, k: usize) -> CellIndex {
        let [nx, ny, _] = self.dims;
        CellIndex::new(i + j * nx + k * nx * ny)
    }

    /// `(i, j, k)` of a natural-order index.
    pub fn ijk(&self, cell: CellIndex) -> [usize; 3] {
        let [nx, ny, _] = self.dims;
        let c = cell.get();
        [c % nx, (c / nx) % ny, c / (nx * ny)]
    }

    /// Neighbour of `cell` offset by `(di, dj, dk)`, if inside the grid.
    pub fn offset(&self, cell: CellIndex, di: isize, dj: isize, dk: isize) -> Option<CellIndex> {
        let [i, j, k] = self.ijk(cell);
        let [nx, ny, nz] = self.dims;
        let i = i.checked_add_signed(di).filter(|v| *v < nx)?;
        let j = j.checked_add_signed(dj).filter(|v| *v < ny)?;
        let k = k.checked_add_signed(dk).filter(|v| *v < nz)?;
        Some(self.index(i, j, k))
    }

    /// Cell center (mean of the eight corners).
    pub fn center(&self, cell: CellIndex) -> [f64; 3] {
        self.centers[cell.get()]
    }

    /// Active index of a cell, `None` for inactive cells.
    pub fn active_index(&self, cell: CellIndex) -> Option<ActiveIndex> {
        self.active[cell.get()]
    }

    /// True for active cells.
    pub fn is_active(&self, cell: CellIndex) -> bool {
        self.active[cell.get()].is_some()
    }

    /// Natural-order indices of active cells, in active order.
    pub fn active_cells(&self) -> &[CellIndex] {
        &self.active_cells
    }

    /// Scatter an active-indexed array into natural order, filling inactive
    /// cells with `fill`. Arrays already of full length are returned as-is.
    pub fn expand_active(&self, values: &[f64], fill: f64) -> Option<Vec<f64>> {
        if values.len() == self.n_cells() {
            return Some(values.to_vec());
        }
        if values.len() != self.n_active() {
            return None;
        }
        let mut out = vec![fill; self.n_cells()];
        for (a, cell) in self.active_cells.iter().enumerate() {
            out[cell.get()] = values[a];
        }
        Some(out)
    }

    /// Point on pillar `(pi, pj)` at depth `z`.
    pub fn pillar_point(&self, pi: usize, pj: usize, z: f64) -> [f64; 3] {
        let p = 6 * (pj * (self.dims[0] + 1) + pi);
        let c = &self.coord[p..p + 6];
        let dz = c[5] - c[2];
        if dz.abs() < f64::EPSILON {
            return [c[0], c[1], z];
        }
        let t = (z - c[2]) / dz;
        [c[0] + t * (c[3] - c[0]), c[1] + t * (c[4] - c[1]), z]
    }

    /// Corner `0..8` of a cell; bit 0 is +i, bit 1 is +j, bit 2 is bottom.
    pub fn corner(&self, i: usize, j: usize, k: usize, corner: usize) -> [f64; 3] {
        let (ii, jj, t) = (corner & 1, (corner >> 1) & 1, (corner >> 2) & 1);
        let [nx, ny, _] = self.dims;
        let z = self.zcorn[zcorn_index(nx, ny, i, j, k, ii, jj, t)];
        self.pillar_point(i + ii, j + jj, z)
    }

    /// Top horizontal position of node `(pi, pj)`.
    pub fn node_xy(&self, pi: usize, pj: usize) -> [f64; 2] {
        let p = 6 * (pj * (self.dims[0] + 1) + pi);
        [self.coord[p], self.coord[p + 1]]
    }

    /// Cell extents along i and j, measured between opposite face centers.
    pub fn cell_extent(&self, cell: CellIndex) -> [f64; 3] {
        let [i, j, k] = self.ijk(cell);
        let face = |corners: [usize; 4]| {
            let mut c = [0.0; 3];
            for n in corners {
                let p = self.corner(i, j, k, n);
                for d in 0..3 {
                    c[d] += p[d] / 4.0;
                }
            }
            c
        };
        let dist = |a: [f64; 3], b: [f64; 3]| {
            ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
        };
        [
            dist(face([0, 2, 4, 6]), face([1, 3, 5, 7])),
            dist(face([0, 1, 4, 5]), face([2, 3, 6, 7])),
            dist(face([0, 1, 2, 3]), face([4, 5, 6, 7])),
        ]
    }

    /// Horizontal outline of the grid, corners `(0,0)`, `(nx,0)`, `(nx,ny)`, `(0,ny)`.
    pub fn outline_xy(&self) -> [[f64; 2]; 4] {
        let [nx, ny, _] = self.dims;
        [
            self.node_xy(0, 0),
            self.node_xy(nx, 0),
            self.node_xy(nx, ny),
            self.node_xy(0, ny),
        ]
    }

    /// Shallowest and deepest corner depth of column `(i, j)` over active cells.
    pub fn column_z_range(&self, i: usize, j: usize) -> Option<(f64, f64)> {
        let [nx, ny, nz] = self.dims;
        let mut range: Option<(f64, f64)> = None;
        for k in 0..nz {
            if !self.is_active(self.index(i, j, k)) {
                continue;
            }
            for t in 0..2 {
                for jj in 0..2 {
                    for ii in 0..2 {
                        let z = self.zcorn[zcorn_index(nx, ny, i, j, k, ii, jj, t)];
                        range = Some(match range {
                            Some((lo, hi)) => (lo.min(z), hi.max(z)),
                            None => (z, z),
                        });
                    }
                }
            }
        }
        range
    }
}

#[allow(clippy::too_many_arguments)]
fn zcorn_index(
    nx: usize,
    ny: usize,
    i: usize,
    j: usize,
    k: usize,
    ii: usize,
    jj: usize,
    t: usize,
) -> usize {
    k * 8 * nx * ny + t * 4 * nx * ny + j * 4 * nx + jj * 2 * nx + i * 2 + ii
}
