//! Transmissibility multipliers from site/regional flux mismatch.

use std::path::{Path, PathBuf};

use crate::correspondence::SiteCorners;
use crate::grid::{GridError, RefinementRatio};
use crate::io::{ArchiveError, SimulationArchive, write_real_include};
use crate::types::{FaceDirection, PhaseKeywords};

fn slot(direction: FaceDirection) -> usize {
    match direction {
        FaceDirection::XPlus => 0,
        FaceDirection::XMinus => 1,
        FaceDirection::YPlus => 2,
        FaceDirection::YMinus => 3,
    }
}

/// One multiplier per regional cell and lateral direction, natural order.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiplierField {
    dims: [usize; 3],
    values: [Vec<f64>; 4],
}

impl MultiplierField {
    /// All multipliers 1.
    pub fn ones(dims: [usize; 3]) -> Self {
        let n = dims[0] * dims[1] * dims[2];
        Self {
            dims,
            values: std::array::from_fn(|_| vec![1.0; n]),
        }
    }

    /// Grid dimensions.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Multipliers for one direction.
    pub fn get(&self, direction: FaceDirection) -> &[f64] {
        &self.values[slot(direction)]
    }

    /// Mutable multipliers for one direction.
    pub fn get_mut(&mut self, direction: FaceDirection) -> &mut [f64] {
        &mut self.values[slot(direction)]
    }

    /// True when every multiplier is 1.
    pub fn is_identity(&self) -> bool {
        self.values.iter().flatten().all(|m| *m == 1.0)
    }

    /// Include file name for a direction, e.g. `MULTX-_REGIONAL.INC`.
    pub fn file_name(direction: FaceDirection) -> String {
        format!("{}_REGIONAL.INC", direction.multiplier_keyword())
    }

    /// Write the four include files into `dir`, returning their names.
    pub fn write_includes(&self, dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
        let mut written = Vec::with_capacity(4);
        for direction in FaceDirection::ALL {
            let path = dir.join(Self::file_name(direction));
            write_real_include(&path, direction.multiplier_keyword(), self.get(direction))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Directional fluxes summed over all report steps, natural order.
#[derive(Clone, Debug, PartialEq)]
pub struct FluxTotals {
    values: [Vec<f64>; 4],
}

impl FluxTotals {
    /// From explicit arrays in [`FaceDirection::ALL`] order.
    pub fn new(values: [Vec<f64>; 4]) -> Self {
        Self { values }
    }

    /// Sum the phase's directional flux keywords over every restart step.
    pub fn from_archive<A>(archive: &A, keywords: &PhaseKeywords) -> Result<Self, ArchiveError>
    where
        A: SimulationArchive + ?Sized,
    {
        let n = archive.grid().n_cells();
        let mut values: [Vec<f64>; 4] = std::array::from_fn(|_| vec![0.0; n]);
        for direction in FaceDirection::ALL {
            let total = &mut values[slot(direction)];
            for step in 0..archive.n_steps() {
                let flux = archive.restart_global(keywords.flux(direction), step)?;
                for (t, f) in total.iter_mut().zip(&flux) {
                    *t += f;
                }
            }
        }
        Ok(Self { values })
    }

    /// Totals for one direction.
    pub fn get(&self, direction: FaceDirection) -> &[f64] {
        &self.values[slot(direction)]
    }
}

/// Where the site sits in the regional grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CouplingGeometry {
    /// Regional cell counts.
    pub regional_dims: [usize; 3],
    /// Regional cells under the site.
    pub corners: SiteCorners,
    /// Site cells per regional cell.
    pub ratio: RefinementRatio,
}

impl CouplingGeometry {
    /// Site cell counts implied by the corners and ratio.
    pub fn site_dims(&self) -> [usize; 3] {
        let c = self.corners.counts();
        [c[0] * self.ratio.x, c[1] * self.ratio.y, c[2] * self.ratio.z]
    }
}

/// Site cells whose `direction` flux crosses the given regional cell's face,
/// in site-local `(i, j, k)`.
fn site_face_cells(
    direction: FaceDirection,
    local: [usize; 3],
    ratio: &RefinementRatio,
) -> Vec<[usize; 3]> {
    let [i, j, k] = local;
    let (rx, ry) = (ratio.x, ratio.y);
    match direction {
        FaceDirection::XPlus => (0..ry).map(|jj| [i * rx + rx - 1, j * ry + jj, k]).collect(),
        FaceDirection::XMinus => (0..ry).map(|jj| [i * rx, j * ry + jj, k]).collect(),
        FaceDirection::YPlus => (0..rx).map(|ii| [i * rx + ii, j * ry + ry - 1, k]).collect(),
        FaceDirection::YMinus => (0..rx).map(|ii| [i * rx + ii, j * ry, k]).collect(),
    }
}

/// Multipliers `|site flux| / |regional flux|` for the regional cells under
/// the site, 1 elsewhere.
///
/// Site fluxes are aggregated onto regional cells by summing the fine faces
/// that make up each coarse face. Undefined ratios (zero regional flux) give
/// 1. Minus-direction multipliers keep their value only on the site's first
/// column (`I-`) or row (`J-`), whose faces are not already covered by a
/// neighbour's plus-direction multiplier. Cells on the outer domain edge
/// always get 1 for the direction facing out.
pub fn compute_multipliers(
    regional: &FluxTotals,
    site: &FluxTotals,
    geometry: &CouplingGeometry,
) -> Result<MultiplierField, GridError> {
    geometry.ratio.require_flat()?;
    let [nx, ny, nz] = geometry.regional_dims;
    let [snx, sny, snz] = geometry.site_dims();
    let n_regional = nx * ny * nz;
    let n_site = snx * sny * snz;
    for direction in FaceDirection::ALL {
        if regional.get(direction).len() != n_regional || site.get(direction).len() != n_site {
            return Err(GridError::Geometry(format!(
                "{} totals have {} regional and {} site values, expected {} and {}",
                direction.flux_suffix(),
                regional.get(direction).len(),
                site.get(direction).len(),
                n_regional,
                n_site
            )));
        }
    }

    let corners = geometry.corners;
    let mut field = MultiplierField::ones(geometry.regional_dims);
    let mut clamped = 0usize;
    for direction in FaceDirection::ALL {
        let reg = regional.get(direction);
        let fine = site.get(direction);
        let out = field.get_mut(direction);
        for k in corners.min[2]..=corners.max[2] {
            for j in corners.min[1]..=corners.max[1] {
                for i in corners.min[0]..=corners.max[0] {
                    let local = [i - corners.min[0], j - corners.min[1], k - corners.min[2]];
                    let keep = match direction {
                        FaceDirection::XMinus => local[0] == 0,
                        FaceDirection::YMinus => local[1] == 0,
                        _ => true,
                    };
                    let on_edge = match direction {
                        FaceDirection::XPlus => i + 1 == nx,
                        FaceDirection::XMinus => i == 0,
                        FaceDirection::YPlus => j + 1 == ny,
                        FaceDirection::YMinus => j == 0,
                    };
                    if !keep || on_edge {
                        continue;
                    }
                    let cell = i + j * nx + k * nx * ny;
                    let site_total: f64 = site_face_cells(direction, local, &geometry.ratio)
                        .into_iter()
                        .map(|[a, b, c]| fine[a + b * snx + c * snx * sny].abs())
                        .sum();
                    let ratio = site_total / reg[cell].abs();
                    out[cell] = if ratio.is_finite() {
                        ratio
                    } else {
                        clamped += 1;
                        1.0
                    };
                }
            }
        }
    }
    if clamped > 0 {
        tracing::warn!(clamped, "multipliers without regional flux set to 1");
    }
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    fn geometry(ratio: usize) -> CouplingGeometry {
        CouplingGeometry {
            regional_dims: [5, 5, 1],
            corners: SiteCorners {
                min: [1, 1, 0],
                max: [3, 3, 0],
            },
            ratio: RefinementRatio {
                x: ratio,
                y: ratio,
                z: 1,
            },
        }
    }

    fn totals(n: usize, value: f64) -> FluxTotals {
        FluxTotals::new(std::array::from_fn(|_| vec![value; n]))
    }

    #[test]
    fn test_ratio_without_refinement() {
        let g = geometry(1);
        let field = compute_multipliers(&totals(25, 2.0), &totals(9, -3.0), &g).unwrap();
        let x = field.get(FaceDirection::XPlus);
        assert!((x[1 + 5] - 1.5).abs() < TOL);
        assert!((x[3 + 3 * 5] - 1.5).abs() < TOL);
        // Outside the site.
        assert_eq!(x[0], 1.0);
        assert_eq!(x[4 + 4 * 5], 1.0);
        // Minus directions only on the first column/row.
        let xm = field.get(FaceDirection::XMinus);
        assert!((xm[1 + 2 * 5] - 1.5).abs() < TOL);
        assert_eq!(xm[2 + 2 * 5], 1.0);
        let ym = field.get(FaceDirection::YMinus);
        assert!((ym[2 + 5] - 1.5).abs() < TOL);
        assert_eq!(ym[2 + 2 * 5], 1.0);
    }

    #[test]
    fn test_refined_sums_fine_faces() {
        let g = geometry(2);
        let site = totals(36, 1.0);
        let field = compute_multipliers(&totals(25, 4.0), &site, &g).unwrap();
        // Two fine faces of 1.0 over a coarse face of 4.0.
        for d in FaceDirection::ALL {
            assert!((field.get(d)[1 + 5] - 0.5).abs() < TOL);
        }
    }

    #[test]
    fn test_zero_regional_flux_gives_one() {
        let g = geometry(1);
        let field = compute_multipliers(&totals(25, 0.0), &totals(9, 5.0), &g).unwrap();
        assert!(field.is_identity());
    }

    #[test]
    fn test_domain_edge_is_one() {
        let g = CouplingGeometry {
            regional_dims: [3, 3, 1],
            corners: SiteCorners {
                min: [0, 0, 0],
                max: [2, 2, 0],
            },
            ratio: RefinementRatio::ONE,
        };
        let field = compute_multipliers(&totals(9, 1.0), &totals(9, 3.0), &g).unwrap();
        let x = field.get(FaceDirection::XPlus);
        assert_eq!(x[2], 1.0);
        assert!((x[1] - 3.0).abs() < TOL);
        assert_eq!(field.get(FaceDirection::XMinus)[0], 1.0);
        assert_eq!(field.get(FaceDirection::YMinus)[1], 1.0);
        assert_eq!(field.get(FaceDirection::YPlus)[7], 1.0);
    }

    #[test]
    fn test_idempotent() {
        let g = geometry(2);
        let reg = FluxTotals::new(std::array::from_fn(|d| (0..25).map(|c| (c + d) as f64).collect()));
        let site = FluxTotals::new(std::array::from_fn(|d| (0..36).map(|c| (c * d) as f64 * 0.1).collect()));
        let a = compute_multipliers(&reg, &site, &g).unwrap();
        let b = compute_multipliers(&reg, &site, &g).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_size_and_vertical_checks() {
        let g = geometry(1);
        assert!(compute_multipliers(&totals(24, 1.0), &totals(9, 1.0), &g).is_err());
        let mut deep = geometry(1);
        deep.ratio.z = 2;
        assert!(matches!(
            compute_multipliers(&totals(25, 1.0), &totals(18, 1.0), &deep),
            Err(GridError::UnsupportedVerticalRefinement { ratio: 2 })
        ));
    }

    #[test]
    fn test_write_includes() {
        let dir = tempfile::tempdir().unwrap();
        let paths = MultiplierField::ones([2, 1, 1]).write_includes(dir.path()).unwrap();
        assert_eq!(paths.len(), 4);
        let text = std::fs::read_to_string(dir.path().join("MULTY-_REGIONAL.INC")).unwrap();
        assert!(text.contains("MULTY-\n1\n1\n/"));
    }
}
