//! Pressure transfer between two independently built decks.

use std::collections::HashMap;

use super::borders::{fipnum_tags, site_border_faces};
use super::GivenOptions;
use crate::correspondence::{BoundaryFace, MatchOptions, SideMatch, border_segment, match_boundary};
use crate::error::Result;
use crate::grid::CornerPointGrid;
use crate::io::{BcconRow, SimulationArchive};
use crate::projection::{FallbackPoint, PressureProjector, ScatteredInterpolator};
use crate::types::{CellIndex, FaceId, PhaseKeywords, SideBoundaries};

/// Vertical offset of the fallback evaluation point from the matched cell
/// center; keeps the point strictly inside the support.
const FALLBACK_LIFT: f64 = 1e-4;

#[derive(Clone, Debug)]
struct SideProjection {
    faces: Vec<BoundaryFace>,
    support: Vec<CellIndex>,
    projector: PressureProjector,
}

impl SideProjection {
    fn new(m: &SideMatch, regional: &CornerPointGrid, vertical: bool, hydrostatic: bool) -> Self {
        let faces: Vec<BoundaryFace> = m
            .faces
            .faces
            .iter()
            .filter(|f| f.regional_cell.is_some())
            .cloned()
            .collect();
        let points: Vec<[f64; 3]> = m.support.iter().map(|s| s.position).collect();
        let support: Vec<CellIndex> = m.support.iter().map(|s| s.cell).collect();
        let node_of: HashMap<CellIndex, usize> =
            support.iter().enumerate().map(|(n, c)| (*c, n)).collect();
        let interp = if vertical {
            ScatteredInterpolator::spatial(points)
        } else {
            ScatteredInterpolator::planar(points)
        };
        let targets: Vec<[f64; 3]> = faces.iter().map(|f| f.centroid).collect();
        let fallbacks: Vec<Option<FallbackPoint>> = faces
            .iter()
            .map(|f| {
                if !vertical {
                    return None;
                }
                let cell = f.regional_cell?;
                let density_node = *node_of.get(&cell)?;
                let lift = if f.site_cell[2] == 0 {
                    FALLBACK_LIFT
                } else {
                    -FALLBACK_LIFT
                };
                let z = regional.center(cell)[2] + lift;
                Some(FallbackPoint {
                    position: [f.centroid[0], f.centroid[1], z],
                    density_node,
                })
            })
            .collect();
        let projector = PressureProjector::new(&interp, &targets, &fallbacks, hydrostatic);
        tracing::debug!(
            side = %m.faces.side,
            faces = faces.len(),
            dropped = m.faces.len() - faces.len(),
            support = support.len(),
            direct = projector.n_direct(),
            "given-deck side"
        );
        Self {
            faces,
            support,
            projector,
        }
    }
}

/// Geometry of a given-deck projection, resolved once and then evaluated per
/// regional report step.
#[derive(Clone, Debug)]
pub struct GivenProjection {
    sides: SideBoundaries<SideProjection>,
    fipnum: Vec<i32>,
    keywords: PhaseKeywords,
    hydrostatic: bool,
    site_initial: Option<Vec<f64>>,
}

impl GivenProjection {
    /// Match the site outline against the regional grid and prepare the
    /// interpolation weights.
    ///
    /// With `options.zones`, both archives must carry the zone keyword in
    /// their `INIT` file. With `options.incremental`, the site archive must
    /// hold `PRESSURE` at its first restart step.
    pub fn build<R, S>(regional: &R, site: &S, options: &GivenOptions) -> Result<Self>
    where
        R: SimulationArchive + ?Sized,
        S: SimulationArchive + ?Sized,
    {
        let regional_grid = regional.grid();
        let site_grid = site.grid();
        let (regional_zones, site_zones) = if options.zones {
            (
                Some(regional.init_ints(&options.zone_keyword)?),
                Some(site.init_ints(&options.zone_keyword)?),
            )
        } else {
            (None, None)
        };
        let borders = site_border_faces(site, site_zones.as_deref())?;
        let outline = site_grid.outline_xy();
        let vertical = regional_grid.dims()[2] > 1;
        let match_options = MatchOptions {
            regional_zones: regional_zones.as_deref(),
            vertical,
        };
        let matches = borders.map(|set| {
            let border = border_segment(set.side, &outline);
            match_boundary(set, regional_grid, border, &match_options)
        });
        let fipnum = fipnum_tags(regional_grid, site_grid, &matches);
        // Incremental series use pressure changes, so the depth shift of a
        // fallback point cancels and no density is read.
        let hydrostatic = vertical && !options.incremental;
        let sides =
            matches.map_ref(|m| SideProjection::new(m, regional_grid, vertical, hydrostatic));

        let site_initial = if options.incremental {
            let p0 = site.restart_global("PRESSURE", 0)?;
            Some(
                sides
                    .iter()
                    .flat_map(|(_, s)| s.faces.iter())
                    .map(|f| {
                        let [i, j, k] = f.site_cell;
                        p0[site_grid.index(i, j, k).get()]
                    })
                    .collect(),
            )
        } else {
            None
        };
        let projection = Self {
            sides,
            fipnum,
            keywords: options.phase.keywords(),
            hydrostatic,
            site_initial,
        };
        tracing::info!(
            faces = projection.n_faces(),
            incremental = options.incremental,
            hydrostatic,
            zones = options.zones,
            "given-deck correspondence"
        );
        Ok(projection)
    }

    /// Faces with a regional correspondence.
    pub fn n_faces(&self) -> usize {
        self.sides.iter().map(|(_, s)| s.faces.len()).sum()
    }

    /// Ids of the kept faces, in side order.
    pub fn face_ids(&self) -> Vec<FaceId> {
        self.kept().map(|f| f.id).collect()
    }

    /// `BCCON` rows of the kept faces.
    pub fn bccon_rows(&self) -> Vec<BcconRow> {
        self.sides
            .iter()
            .flat_map(|(side, s)| {
                s.faces.iter().map(move |f| BcconRow {
                    id: f.id,
                    cell: f.site_cell,
                    side,
                })
            })
            .collect()
    }

    /// Whether fallback pressures get a density-based depth correction.
    ///
    /// Only absolute (non-incremental) projections onto layered regional
    /// grids do.
    pub fn hydrostatic(&self) -> bool {
        self.hydrostatic
    }

    /// Regional `FIPNUM` tags (1 interior, 2 matched, 3 support, 4 other).
    pub fn fipnum(&self) -> &[i32] {
        &self.fipnum
    }

    fn kept(&self) -> impl Iterator<Item = &BoundaryFace> {
        self.sides.iter().flat_map(|(_, s)| s.faces.iter())
    }

    /// Projected pressures (bar) at one regional restart step, one per kept
    /// face; `NaN` where the face cannot be evaluated.
    pub fn step_pressures<R>(&self, regional: &R, step: usize) -> Result<Vec<f64>>
    where
        R: SimulationArchive + ?Sized,
    {
        let pressure = regional.restart_global("PRESSURE", step)?;
        let density = if self.hydrostatic {
            regional.restart_global(self.keywords.density(), step)?
        } else {
            Vec::new()
        };
        let mut out = Vec::with_capacity(self.n_faces());
        for (_, side) in self.sides.iter() {
            let p: Vec<f64> = side.support.iter().map(|c| pressure[c.get()]).collect();
            let rho: Vec<f64> = if self.hydrostatic {
                side.support.iter().map(|c| density[c.get()]).collect()
            } else {
                Vec::new()
            };
            out.extend(
                side.projector
                    .project(&p, &rho)
                    .into_iter()
                    .map(|v| v.unwrap_or(f64::NAN)),
            );
        }
        Ok(out)
    }

    /// Boundary pressures at every regional restart step.
    ///
    /// In incremental mode each value is the site's own initial pressure plus
    /// the change of the projected regional pressure since the first step.
    pub fn pressure_series<R>(&self, regional: &R) -> Result<Vec<Vec<f64>>>
    where
        R: SimulationArchive + ?Sized,
    {
        let mut series = (0..regional.n_steps())
            .map(|step| self.step_pressures(regional, step))
            .collect::<Result<Vec<_>>>()?;
        if let (Some(initial), Some(first)) = (&self.site_initial, series.first().cloned()) {
            for values in series.iter_mut() {
                for ((v, p0), s0) in values.iter_mut().zip(&first).zip(initial) {
                    *v = s0 + (*v - p0);
                }
            }
        }
        Ok(series)
    }
}
