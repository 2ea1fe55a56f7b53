//! Pressure projection from regional cell centers onto site boundary faces.
//!
//! Pressures are in bar. Three variants:
//! - [`regular_side_pressures`]: per layer, bilinear over the two rows of
//!   regional cells straddling the footprint edge (`pres`)
//! - [`two_point_pressures`]: mean of the straddling pair (`pres2p`)
//! - [`PressureProjector`]: scattered support with a hydrostatic fallback,
//!   for rotated footprints and given decks

use super::interpolate::{RegularGrid2D, ScatteredInterpolator, SimplexWeights};
use crate::correspondence::{BoundaryFaceSet, SiteCorners};
use crate::grid::{Grid, GridError, RefinementRatio};
use crate::types::Side;

use super::flux::replicate_along_side;

/// Gravitational acceleration, m/s².
pub const GRAVITY: f64 = 9.81;

/// Pascal per bar.
pub const PASCAL_PER_BAR: f64 = 1e5;

/// Regional `(i, j)` pairs straddling the site border for one along-side
/// index, as (outside, inside).
fn straddling_pair(side: Side, corners: &SiteCorners, along: usize) -> ([usize; 2], [usize; 2]) {
    let (min, max) = (corners.min, corners.max);
    match side {
        Side::North => ([along, min[1] - 1], [along, min[1]]),
        Side::South => ([along, max[1] + 1], [along, max[1]]),
        Side::East => ([min[0] - 1, along], [min[0], along]),
        Side::West => ([max[0] + 1, along], [max[0], along]),
    }
}

fn along_range(side: Side, corners: &SiteCorners) -> std::ops::RangeInclusive<usize> {
    if side.is_i_face() {
        corners.min[1]..=corners.max[1]
    } else {
        corners.min[0]..=corners.max[0]
    }
}

/// Interpolate regional pressures onto the faces of one side, layer by layer.
///
/// Each layer's interpolator spans the straddling rows (or columns),
/// extended by one cell past both ends of the side. Faces outside that range
/// are extrapolated linearly.
pub fn regular_side_pressures(
    side: Side,
    regional: &Grid,
    corners: &SiteCorners,
    ratio: &RefinementRatio,
    pressure: &[f64],
    faces: &BoundaryFaceSet,
) -> Result<Vec<f64>, GridError> {
    ratio.require_flat()?;
    corners.require_interior(regional.dims())?;
    let (along_axis, normal_axis) = if side.is_i_face() { (1, 0) } else { (0, 1) };
    let n_along = regional.dims()[along_axis];
    let range = along_range(side, corners);
    let lo = range.start().saturating_sub(1);
    let hi = (*range.end() + 1).min(n_along - 1);

    let mut layers = Vec::new();
    for k in corners.min[2]..=corners.max[2] {
        let mut u = Vec::with_capacity(hi - lo + 1);
        let mut values = vec![0.0; 2 * (hi - lo + 1)];
        let (outside, inside) = straddling_pair(side, corners, lo);
        let v = vec![
            regional.cell_center(outside[0], outside[1], k)[normal_axis],
            regional.cell_center(inside[0], inside[1], k)[normal_axis],
        ];
        for (n, a) in (lo..=hi).enumerate() {
            let (outside, inside) = straddling_pair(side, corners, a);
            u.push(regional.cell_center(outside[0], outside[1], k)[along_axis]);
            values[n] = pressure[regional.index(outside[0], outside[1], k).get()];
            values[hi - lo + 1 + n] = pressure[regional.index(inside[0], inside[1], k).get()];
        }
        let interp = RegularGrid2D::new(u, v, values).ok_or_else(|| {
            GridError::Geometry(format!("{side} side has non-monotonic regional centers"))
        })?;
        layers.push(interp);
    }

    faces
        .faces
        .iter()
        .map(|face| {
            let layer = face.site_cell[2] / ratio.z;
            let interp = layers.get(layer).ok_or_else(|| {
                GridError::Geometry(format!("site layer {} is below the footprint", face.site_cell[2]))
            })?;
            Ok(interp.eval(face.centroid[along_axis], face.centroid[normal_axis]))
        })
        .collect()
}

/// Mean pressure of the straddling regional cells, replicated onto the fine
/// faces of one side.
pub fn two_point_pressures(
    side: Side,
    regional: &Grid,
    corners: &SiteCorners,
    ratio: &RefinementRatio,
    pressure: &[f64],
) -> Result<Vec<f64>, GridError> {
    ratio.require_flat()?;
    corners.require_interior(regional.dims())?;
    let mut coarse = Vec::new();
    for k in corners.min[2]..=corners.max[2] {
        for a in along_range(side, corners) {
            let (outside, inside) = straddling_pair(side, corners, a);
            let p_out = pressure[regional.index(outside[0], outside[1], k).get()];
            let p_in = pressure[regional.index(inside[0], inside[1], k).get()];
            coarse.push(0.5 * (p_out + p_in));
        }
    }
    let n_coarse = along_range(side, corners).count();
    let r = ratio.along(side);
    replicate_along_side(&coarse, n_coarse * r, r)
}

/// Alternative evaluation point for a face whose centroid lies outside the
/// scattered support.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FallbackPoint {
    /// Evaluation point, usually the face position at the matched cell depth.
    pub position: [f64; 3],
    /// Support node whose density corrects the pressure for the depth offset.
    pub density_node: usize,
}

#[derive(Clone, Debug)]
struct Fallback {
    weights: Option<SimplexWeights>,
    dz: f64,
    density_node: usize,
}

/// Scattered pressure projection with prepared weights.
///
/// Geometry is resolved once; [`project`](Self::project) is then cheap per
/// report step.
#[derive(Clone, Debug)]
pub struct PressureProjector {
    direct: Vec<Option<SimplexWeights>>,
    fallback: Vec<Option<Fallback>>,
    hydrostatic: bool,
}

impl PressureProjector {
    /// Prepare weights for `targets`, with optional per-target fallbacks.
    ///
    /// With `hydrostatic`, fallback values are shifted by
    /// `rho * g * (z_target - z_fallback)`.
    pub fn new(
        support: &ScatteredInterpolator,
        targets: &[[f64; 3]],
        fallbacks: &[Option<FallbackPoint>],
        hydrostatic: bool,
    ) -> Self {
        let direct = support.prepare(targets);
        let fallback = targets
            .iter()
            .zip(&direct)
            .enumerate()
            .map(|(n, (target, weights))| {
                if weights.is_some() {
                    return None;
                }
                let point = fallbacks.get(n).copied().flatten()?;
                Some(Fallback {
                    weights: support.weights(point.position),
                    dz: target[2] - point.position[2],
                    density_node: point.density_node,
                })
            })
            .collect();
        Self {
            direct,
            fallback,
            hydrostatic,
        }
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.direct.len()
    }

    /// True without targets.
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty()
    }

    /// Targets resolved without a fallback.
    pub fn n_direct(&self) -> usize {
        self.direct.iter().filter(|w| w.is_some()).count()
    }

    /// Pressures at the targets; `None` where neither the target nor its
    /// fallback can be evaluated.
    ///
    /// `pressures` and `densities` are indexed like the support points.
    pub fn project(&self, pressures: &[f64], densities: &[f64]) -> Vec<Option<f64>> {
        self.direct
            .iter()
            .zip(&self.fallback)
            .map(|(direct, fallback)| {
                if let Some(w) = direct {
                    return Some(w.apply(pressures));
                }
                let fb = fallback.as_ref()?;
                let mut p = fb.weights?.apply(pressures);
                if self.hydrostatic {
                    p += densities[fb.density_node] * GRAVITY * fb.dz / PASCAL_PER_BAR;
                }
                p.is_finite().then_some(p)
            })
            .collect()
    }
}

/// One-shot scattered projection; `NaN` outside the support.
pub fn project_pressure(
    centers: &[[f64; 3]],
    pressures: &[f64],
    targets: &[[f64; 3]],
    vertical: bool,
) -> Vec<f64> {
    let interp = if vertical {
        ScatteredInterpolator::spatial(centers.to_vec())
    } else {
        ScatteredInterpolator::planar(centers.to_vec())
    };
    interp.eval_many(pressures, targets)
}
