//! Reference, regional and site grids derived from one description.
//!
//! The site spacing is canonical: the reference grid covers the regional
//! domain with cells of the site's size, so the reference cell counts are
//! `regional_extent / site_spacing`. The regional grid must be a whole-number
//! coarsening of that spacing along x and y.

use super::{AxisPartition, Grid, GridError, GridKind, SiteRotation, build_grid};
use crate::types::{Footprint, Side};

/// Relative tolerance for "whole number of cells" checks.
const WHOLE_RTOL: f64 = 1e-6;

/// Input for [`NestedGrids::derive`].
#[derive(Clone, Debug)]
pub struct NestedGridSpec {
    /// Regional (and reference) domain extents.
    pub regional_dims: [f64; 3],
    /// Regional partition per axis.
    pub regional_partitions: [AxisPartition; 3],
    /// Site box in regional coordinates.
    pub footprint: Footprint,
    /// Site cell counts.
    pub site_cells: [usize; 3],
    /// Optional site rotation in degrees.
    pub rotation_deg: Option<f64>,
}

/// Number of site cells per regional cell along each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefinementRatio {
    /// Along x.
    pub x: usize,
    /// Along y.
    pub y: usize,
    /// Along z.
    pub z: usize,
}

impl RefinementRatio {
    /// No refinement.
    pub const ONE: Self = Self { x: 1, y: 1, z: 1 };

    /// Ratio along the faces of a side (x for North/South, y for West/East).
    pub fn along(&self, side: Side) -> usize {
        if side.is_i_face() { self.y } else { self.x }
    }

    /// Vertical refinement is unsupported by flux projection and multipliers.
    pub fn require_flat(&self) -> Result<(), GridError> {
        if self.z == 1 {
            Ok(())
        } else {
            Err(GridError::UnsupportedVerticalRefinement { ratio: self.z })
        }
    }
}

/// The three grids of a nested study.
#[derive(Clone, Debug)]
pub struct NestedGrids {
    /// Full domain at site spacing.
    pub reference: Grid,
    /// Full domain, coarse.
    pub regional: Grid,
    /// Site footprint, fine.
    pub site: Grid,
    /// Site footprint.
    pub footprint: Footprint,
    /// Site cells per regional cell.
    pub ratio: RefinementRatio,
}

fn whole(value: f64) -> Option<usize> {
    let r = value.round();
    ((value - r).abs() <= WHOLE_RTOL * r.max(1.0) && r >= 1.0).then_some(r as usize)
}

impl NestedGrids {
    /// Derive reference and site grids from the regional description.
    pub fn derive(spec: &NestedGridSpec) -> Result<Self, GridError> {
        let axis_names = ['x', 'y', 'z'];
        let regional = build_grid(
            GridKind::Regional,
            [0.0; 3],
            spec.regional_dims,
            &spec.regional_partitions,
        )?;

        let extents = spec.footprint.extents();
        let mut spacing = [0.0; 3];
        let mut reference_cells = [0usize; 3];
        for d in 0..3 {
            if spec.site_cells[d] == 0 {
                return Err(GridError::InvalidPartition {
                    axis: axis_names[d],
                    reason: "site cell count must be positive".into(),
                });
            }
            spacing[d] = extents[d] / spec.site_cells[d] as f64;
            reference_cells[d] = whole(spec.regional_dims[d] / spacing[d]).ok_or_else(|| {
                GridError::InvalidPartition {
                    axis: axis_names[d],
                    reason: format!(
                        "regional extent {} is not a whole number of site cells of size {}",
                        spec.regional_dims[d], spacing[d]
                    ),
                }
            })?;
        }

        let mut lateral = [1usize; 2];
        for d in 0..2 {
            let sizes = regional.axis(d).sizes();
            let ratio = whole(sizes[0] / spacing[d]);
            let uniform = ratio.is_some_and(|r| {
                sizes
                    .iter()
                    .all(|s| (s - r as f64 * spacing[d]).abs() <= WHOLE_RTOL * s)
            });
            lateral[d] = match (ratio, uniform) {
                (Some(r), true) => r,
                _ => {
                    return Err(GridError::InvalidPartition {
                        axis: axis_names[d],
                        reason: "regional cells must be whole multiples of the site spacing"
                            .into(),
                    });
                }
            };
        }
        let regional_nz = regional.dims()[2];
        if spec.site_cells[2] % regional_nz != 0 {
            return Err(GridError::InvalidPartition {
                axis: 'z',
                reason: format!(
                    "{} site layers do not subdivide {} regional layers",
                    spec.site_cells[2], regional_nz
                ),
            });
        }
        let ratio = RefinementRatio {
            x: lateral[0],
            y: lateral[1],
            z: spec.site_cells[2] / regional_nz,
        };

        let reference = build_grid(
            GridKind::Reference,
            [0.0; 3],
            spec.regional_dims,
            &reference_cells.map(AxisPartition::Uniform),
        )?;
        let mut site = build_grid(
            GridKind::Site,
            spec.footprint.min,
            extents,
            &spec.site_cells.map(AxisPartition::Uniform),
        )?;
        if let Some(angle) = spec.rotation_deg {
            site = site.with_rotation(SiteRotation::about_footprint(angle, &spec.footprint));
        }

        tracing::debug!(
            reference = ?reference.dims(),
            regional = ?regional.dims(),
            site = ?site.dims(),
            ?ratio,
            "derived nested grids"
        );

        Ok(Self {
            reference,
            regional,
            site,
            footprint: spec.footprint,
            ratio,
        })
    }
}
