//! Site outline faces and regional region tags for externally built decks.

use std::collections::BTreeSet;

use crate::correspondence::geometry::is_point_inside_polygon;
use crate::correspondence::{BoundaryFace, BoundaryFaceSet, PointIndex, SideMatch};
use crate::grid::CornerPointGrid;
use crate::io::{ArchiveError, SimulationArchive};
use crate::types::{CellIndex, FaceId, Side, SideBoundaries};

/// Orientation of the `(i, j)` counting relative to `x` and `y`.
///
/// Each factor is `1` when the coordinate decreases with its index and `-1`
/// when it increases, so `center - factor * half_width` is the face at the
/// low-index end.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Handedness {
    /// Sign for the `i` direction.
    pub x: f64,
    /// Sign for the `j` direction.
    pub y: f64,
}

/// Compare the first cell with its `i` and `j` neighbours.
pub fn ij_orientation(grid: &CornerPointGrid) -> Handedness {
    let [nx, ny, _] = grid.dims();
    let origin = grid.center(grid.index(0, 0, 0));
    let sign = |other: f64, here: f64| if other < here { 1.0 } else { -1.0 };
    let x = if nx > 1 {
        sign(grid.center(grid.index(1, 0, 0))[0], origin[0])
    } else {
        -1.0
    };
    let y = if ny > 1 {
        sign(grid.center(grid.index(0, 1, 0))[1], origin[1])
    } else {
        -1.0
    };
    Handedness { x, y }
}

/// Outline cells of one side in BCCON order.
///
/// North and West run with increasing index, South and East with decreasing
/// index, which walks the outline in one rotational sense.
fn traversal(side: Side, nx: usize, ny: usize) -> Vec<(usize, usize)> {
    match side {
        Side::North => (0..nx).map(|i| (i, 0)).collect(),
        Side::West => (0..ny).map(|j| (nx - 1, j)).collect(),
        Side::South => (0..nx).rev().map(|i| (i, ny - 1)).collect(),
        Side::East => (0..ny).rev().map(|j| (0, j)).collect(),
    }
}

/// Boundary faces of every side of a site deck, positioned half a cell
/// outward from the owning cell center.
///
/// Face ids count every outline position, active or not, layer-major per side;
/// only active cells get a face. Half widths come from `DX`/`DY` in the site
/// `INIT` file, or from the corner-point geometry when those are absent.
/// `zones` holds the site region tag per cell.
pub fn site_border_faces<A>(
    site: &A,
    zones: Option<&[i32]>,
) -> Result<SideBoundaries<BoundaryFaceSet>, ArchiveError>
where
    A: SimulationArchive + ?Sized,
{
    let grid = site.grid();
    let [nx, ny, nz] = grid.dims();
    let hand = ij_orientation(grid);
    let dx = site.init_global("DX").ok();
    let dy = site.init_global("DY").ok();
    let half = |values: &Option<Vec<f64>>, cell: CellIndex, axis: usize| match values {
        Some(v) if v[cell.get()] > 0.0 => 0.5 * v[cell.get()],
        _ => 0.5 * grid.cell_extent(cell)[axis],
    };

    let mut next_id = 0usize;
    let mut build = |side: Side| {
        let mut faces = Vec::new();
        for k in 0..nz {
            for (i, j) in traversal(side, nx, ny) {
                let id = FaceId::new(next_id);
                next_id += 1;
                let cell = grid.index(i, j, k);
                if !grid.is_active(cell) {
                    continue;
                }
                let mut centroid = grid.center(cell);
                match side {
                    Side::North => centroid[1] += hand.y * half(&dy, cell, 1),
                    Side::South => centroid[1] -= hand.y * half(&dy, cell, 1),
                    Side::West => centroid[0] -= hand.x * half(&dx, cell, 0),
                    Side::East => centroid[0] += hand.x * half(&dx, cell, 0),
                }
                faces.push(BoundaryFace {
                    id,
                    site_cell: [i, j, k],
                    regional_cell: None,
                    centroid,
                    zone: zones.map(|z| z[cell.get()]),
                });
            }
        }
        BoundaryFaceSet { side, faces }
    };
    Ok(SideBoundaries::from_fn(&mut build))
}

/// `FIPNUM` tag of a regional cell in given-deck mode.
pub mod fipnum {
    /// Under the site footprint within its depth range.
    pub const INSIDE: i32 = 1;
    /// Matched to a site boundary face.
    pub const MATCHED: i32 = 2;
    /// Neighbour of a matched cell, used as interpolation support.
    pub const SUPPORT: i32 = 3;
    /// Everything else.
    pub const OUTSIDE: i32 = 4;
}

/// Region tags for the regional grid: site interior, matched border cells,
/// their support neighbours, and the rest.
pub fn fipnum_tags(
    regional: &CornerPointGrid,
    site: &CornerPointGrid,
    matches: &SideBoundaries<SideMatch>,
) -> Vec<i32> {
    let [snx, sny, snz] = site.dims();
    let outline = site.outline_xy();
    let columns: Vec<([f64; 3], (f64, f64))> = (0..sny)
        .flat_map(|j| (0..snx).map(move |i| (i, j)))
        .filter_map(|(i, j)| {
            let top = site.index(i, j, 0);
            let bottom = site.index(i, j, snz - 1);
            site.is_active(top)
                .then(|| (site.center(top), (site.center(top)[2], site.center(bottom)[2])))
        })
        .collect();
    let column_index = PointIndex::new(
        columns
            .iter()
            .enumerate()
            .map(|(n, (top, _))| ([top[0], top[1], 0.0], n)),
    );

    let mut tags: Vec<i32> = (0..regional.n_cells())
        .map(|n| {
            let cell = CellIndex::new(n);
            if !regional.is_active(cell) {
                return fipnum::OUTSIDE;
            }
            let c = regional.center(cell);
            if !is_point_inside_polygon([c[0], c[1]], &outline, false) {
                return fipnum::OUTSIDE;
            }
            let nearest = column_index.nearest_l1([c[0], c[1], 0.0]).map(|n| &columns[n]);
            match nearest {
                Some((_, (top, bottom))) if c[2] >= *top && c[2] <= *bottom => fipnum::INSIDE,
                _ => fipnum::OUTSIDE,
            }
        })
        .collect();

    let matched: BTreeSet<CellIndex> = matches
        .iter()
        .flat_map(|(_, m)| m.matched.iter().copied())
        .collect();
    for (_, m) in matches.iter() {
        for cell in &m.neighbours {
            if !matched.contains(cell) {
                tags[cell.get()] = fipnum::SUPPORT;
            }
        }
    }
    for cell in matched {
        tags[cell.get()] = fipnum::MATCHED;
    }
    tags
}
