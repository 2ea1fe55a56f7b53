//! Lumping of the regional pore volume around the site onto the site's
//! boundary cells.

use crate::correspondence::{NodeClass, SiteCorners, side_cells};
use crate::grid::{Grid, RefinementRatio};
use crate::types::{Side, SideBoundaries};

/// Regional pore volume attributed to each side: its wedge plus half of each
/// adjacent corner.
///
/// `porv` and `classes` are per regional cell in natural order.
pub fn porv_projections(classes: &[NodeClass], porv: &[f64]) -> SideBoundaries<f64> {
    let mut by_class = [0.0; 10];
    for (class, pv) in classes.iter().zip(porv) {
        by_class[class.value() as usize] += pv;
    }
    SideBoundaries::from_fn(|side| {
        let [a, b] = NodeClass::corners(side);
        by_class[NodeClass::wedge(side).value() as usize]
            + 0.5 * (by_class[a.value() as usize] + by_class[b.value() as usize])
    })
}

/// Pore volume of one fine row of site cells along each side, taken from the
/// regional cells just inside the footprint.
pub fn inner_side_porv(
    regional: &Grid,
    corners: &SiteCorners,
    ratio: &RefinementRatio,
    porv: &[f64],
) -> SideBoundaries<f64> {
    let (min, max) = (corners.min, corners.max);
    SideBoundaries::from_fn(|side| {
        let mut total = 0.0;
        for k in min[2]..=max[2] {
            match side {
                Side::North | Side::South => {
                    let j = if side == Side::North { min[1] } else { max[1] };
                    for i in min[0]..=max[0] {
                        total += porv[regional.index(i, j, k).get()];
                    }
                }
                Side::West | Side::East => {
                    let i = if side == Side::East { min[0] } else { max[0] };
                    for j in min[1]..=max[1] {
                        total += porv[regional.index(i, j, k).get()];
                    }
                }
            }
        }
        // One fine row covers 1/ratio of the coarse row across the border.
        let across = if side.is_i_face() { ratio.x } else { ratio.y };
        total / across as f64
    })
}

/// Pore-volume multiplier per site cell (natural order): `1 + pv_side /
/// pv_inner_side` on the cells along each side, accumulated at corners.
pub fn site_porv_multipliers(
    site_dims: [usize; 3],
    side_porv: &SideBoundaries<f64>,
    inner_porv: &SideBoundaries<f64>,
) -> Vec<f64> {
    let [nx, ny, nz] = site_dims;
    let mut mult = vec![1.0; nx * ny * nz];
    for side in Side::ALL {
        let inner = *inner_porv.get(side);
        if inner <= 0.0 {
            tracing::warn!(%side, "no inner pore volume, skipping side");
            continue;
        }
        let increment = side_porv.get(side) / inner;
        for k in 0..nz {
            for (i, j) in side_cells(side, nx, ny) {
                mult[i + j * nx + k * nx * ny] += increment;
            }
        }
    }
    mult
}
