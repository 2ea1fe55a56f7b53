//! Face-normal flux extraction on the regional grid and projection onto the
//! finer site faces.
//!
//! Values are flux densities (rate per unit face area), positive into the
//! site. Refinement replicates a coarse value onto every fine face under it.

use crate::correspondence::SiteCorners;
use crate::grid::{Grid, GridError, RefinementRatio};
use crate::types::{CellIndex, Side};

/// Regional cells whose `+` face is the given site side, layer-major and
/// ascending along the side.
///
/// North and East read the outside neighbour (its `+` face is the site
/// border); South and West read the inside cell.
pub fn regional_face_cells(side: Side, regional: &Grid, corners: &SiteCorners) -> Vec<CellIndex> {
    let (min, max) = (corners.min, corners.max);
    let mut cells = Vec::new();
    for k in min[2]..=max[2] {
        match side {
            Side::North => cells.extend((min[0]..=max[0]).map(|i| regional.index(i, min[1] - 1, k))),
            Side::South => cells.extend((min[0]..=max[0]).map(|i| regional.index(i, max[1], k))),
            Side::East => cells.extend((min[1]..=max[1]).map(|j| regional.index(min[0] - 1, j, k))),
            Side::West => cells.extend((min[1]..=max[1]).map(|j| regional.index(max[0], j, k))),
        }
    }
    cells
}

/// Inflow flux densities through the regional faces of one site side.
///
/// `flux_i` and `flux_j` are the `I+`/`J+` face flows per regional cell
/// (natural order). Each value is signed into the site and divided by the
/// face area.
pub fn regional_face_fluxes(
    side: Side,
    regional: &Grid,
    corners: &SiteCorners,
    flux_i: &[f64],
    flux_j: &[f64],
) -> Result<Vec<f64>, GridError> {
    corners.require_interior(regional.dims())?;
    let flux = if side.is_i_face() { flux_i } else { flux_j };
    let sign = side.inflow_sign();
    let values = regional_face_cells(side, regional, corners)
        .into_iter()
        .map(|cell| {
            let [i, j, k] = regional.ijk(cell);
            let [dx, dy, dz] = regional.cell_size(i, j, k);
            let area = if side.is_i_face() { dy * dz } else { dx * dz };
            sign * flux[cell.get()] / area
        })
        .collect();
    Ok(values)
}

/// Copy each coarse value onto the `ratio` fine faces under it.
///
/// `coarse` is layer-major with `n_fine_along / ratio` values per layer.
pub fn replicate_along_side(
    coarse: &[f64],
    n_fine_along: usize,
    ratio: usize,
) -> Result<Vec<f64>, GridError> {
    if ratio == 0 || n_fine_along % ratio != 0 {
        return Err(GridError::Geometry(format!(
            "{n_fine_along} fine faces are not a multiple of refinement {ratio}"
        )));
    }
    let n_coarse = n_fine_along / ratio;
    if n_coarse == 0 || coarse.len() % n_coarse != 0 {
        return Err(GridError::Geometry(format!(
            "{} coarse values do not fill layers of {n_coarse}",
            coarse.len()
        )));
    }
    let layers = coarse.len() / n_coarse;
    let mut fine = Vec::with_capacity(layers * n_fine_along);
    for layer in coarse.chunks(n_coarse) {
        for m in 0..n_fine_along {
            fine.push(layer[m / ratio]);
        }
    }
    Ok(fine)
}

/// Project coarse face flux densities onto the fine faces of one side.
///
/// `fine_sizes` are the fine cell sizes along the side; their count fixes the
/// number of fine faces per layer. Vertical refinement is rejected.
///
/// # Example
///
/// ```
/// use expreccs::grid::RefinementRatio;
/// use expreccs::projection::project_flux;
/// use expreccs::types::Side;
///
/// let ratio = RefinementRatio { x: 2, y: 2, z: 1 };
/// let fine = project_flux(Side::North, &[2.0, 2.0, 2.0], &[50.0; 6], &ratio).unwrap();
/// assert_eq!(fine, vec![2.0; 6]);
/// ```
pub fn project_flux(
    side: Side,
    coarse: &[f64],
    fine_sizes: &[f64],
    ratio: &RefinementRatio,
) -> Result<Vec<f64>, GridError> {
    ratio.require_flat()?;
    replicate_along_side(coarse, fine_sizes.len(), ratio.along(side))
}

/// Size-weighted average of fine densities back onto the coarse faces.
pub fn restrict_flux(
    side: Side,
    fine: &[f64],
    fine_sizes: &[f64],
    ratio: &RefinementRatio,
) -> Result<Vec<f64>, GridError> {
    ratio.require_flat()?;
    let r = ratio.along(side);
    let n = fine_sizes.len();
    if n == 0 || n % r != 0 || fine.len() % n != 0 {
        return Err(GridError::Geometry(format!(
            "{} fine values do not fill layers of {n} faces at refinement {r}",
            fine.len()
        )));
    }
    let mut coarse = Vec::with_capacity(fine.len() / r);
    for layer in fine.chunks(n) {
        for (values, sizes) in layer.chunks(r).zip(fine_sizes.chunks(r)) {
            let total: f64 = sizes.iter().sum();
            let sum: f64 = values.iter().zip(sizes).map(|(v, s)| v * s).sum();
            coarse.push(sum / total);
        }
    }
    Ok(coarse)
}
