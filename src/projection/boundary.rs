//! Per-report-step boundary values for generated site models.

use serde::Deserialize;

use super::flux::{project_flux, regional_face_fluxes};
use super::interpolate::ScatteredInterpolator;
use super::pressure::{PressureProjector, regular_side_pressures, two_point_pressures};
use crate::correspondence::{BoundaryFaceSet, SiteCorners};
use crate::grid::{Grid, GridError, RefinementRatio};
use crate::types::{CellIndex, Side, SideBoundaries};

/// How the site model is closed at its lateral boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
    /// Prescribed inflow rates from regional face fluxes.
    Flux,
    /// Dirichlet pressure interpolated across the footprint edge.
    #[default]
    Pres,
    /// Dirichlet pressure from the two straddling regional cells.
    Pres2p,
    /// No boundary conditions; pore volume of the surroundings lumped onto
    /// the site's edge cells.
    Porvproj,
    /// Closed boundary, wells only.
    Wells,
}

impl BoundaryKind {
    /// Lowercase name used in folder names.
    pub fn name(self) -> &'static str {
        match self {
            BoundaryKind::Flux => "flux",
            BoundaryKind::Pres => "pres",
            BoundaryKind::Pres2p => "pres2p",
            BoundaryKind::Porvproj => "porvproj",
            BoundaryKind::Wells => "wells",
        }
    }

    /// Dirichlet pressure kinds.
    pub fn is_pressure(self) -> bool {
        matches!(self, BoundaryKind::Pres | BoundaryKind::Pres2p)
    }

    /// Kinds that write per-step boundary properties.
    pub fn has_face_values(self) -> bool {
        matches!(self, BoundaryKind::Flux | BoundaryKind::Pres | BoundaryKind::Pres2p)
    }
}

impl std::fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Regional restart arrays for one report step, natural cell order.
#[derive(Clone, Copy, Debug)]
pub struct RegionalState<'a> {
    /// Cell pressure, bar.
    pub pressure: &'a [f64],
    /// `I+` face flow.
    pub flux_i: &'a [f64],
    /// `J+` face flow.
    pub flux_j: &'a [f64],
}

#[derive(Clone, Debug)]
struct LayerProjector {
    /// Positions of the targets in the side's face list.
    faces: Vec<usize>,
    cells: Vec<CellIndex>,
    projector: PressureProjector,
}

/// Maps regional states onto the boundary faces of a co-generated site grid.
///
/// Output vectors are indexed by face id (sides concatenated North, West,
/// South, East). `NaN` marks a face without a value for that step.
#[derive(Clone, Debug)]
pub struct BoundaryProjection<'a> {
    kind: BoundaryKind,
    regional: &'a Grid,
    site: &'a Grid,
    corners: SiteCorners,
    ratio: RefinementRatio,
    faces: &'a SideBoundaries<BoundaryFaceSet>,
    rotated: Option<SideBoundaries<Vec<LayerProjector>>>,
}

impl<'a> BoundaryProjection<'a> {
    /// Prepare the projection; rotated pressure kinds build scattered
    /// per-layer interpolators here.
    pub fn new(
        kind: BoundaryKind,
        regional: &'a Grid,
        site: &'a Grid,
        corners: SiteCorners,
        ratio: RefinementRatio,
        faces: &'a SideBoundaries<BoundaryFaceSet>,
    ) -> Result<Self, GridError> {
        ratio.require_flat()?;
        corners.require_interior(regional.dims())?;
        let rotated = match site.rotation() {
            Some(rot) if !rot.is_identity() && kind.is_pressure() => {
                Some(faces.map_ref(|set| layer_projectors(regional, &corners, set)))
            }
            _ => None,
        };
        tracing::debug!(
            %kind,
            faces = faces.iter().map(|(_, s)| s.len()).sum::<usize>(),
            rotated = rotated.is_some(),
            "prepared boundary projection"
        );
        Ok(Self {
            kind,
            regional,
            site,
            corners,
            ratio,
            faces,
            rotated,
        })
    }

    /// Total number of boundary faces.
    pub fn n_faces(&self) -> usize {
        self.faces.iter().map(|(_, s)| s.len()).sum()
    }

    /// Boundary kind.
    pub fn kind(&self) -> BoundaryKind {
        self.kind
    }

    /// Face values for one regional report step.
    pub fn project_step(&self, state: &RegionalState<'_>) -> Result<Vec<f64>, GridError> {
        let mut out = Vec::with_capacity(self.n_faces());
        for (side, set) in self.faces.iter() {
            let values = match self.kind {
                BoundaryKind::Flux => {
                    let coarse = regional_face_fluxes(
                        side,
                        self.regional,
                        &self.corners,
                        state.flux_i,
                        state.flux_j,
                    )?;
                    let sizes = self.site_sizes_along(side);
                    project_flux(side, &coarse, &sizes, &self.ratio)?
                }
                BoundaryKind::Pres => match &self.rotated {
                    Some(layers) => rotated_values(layers.get(side), set.len(), state.pressure),
                    None => regular_side_pressures(
                        side,
                        self.regional,
                        &self.corners,
                        &self.ratio,
                        state.pressure,
                        set,
                    )?,
                },
                BoundaryKind::Pres2p => match &self.rotated {
                    Some(layers) => rotated_values(layers.get(side), set.len(), state.pressure),
                    None => two_point_pressures(
                        side,
                        self.regional,
                        &self.corners,
                        &self.ratio,
                        state.pressure,
                    )?,
                },
                BoundaryKind::Porvproj | BoundaryKind::Wells => vec![f64::NAN; set.len()],
            };
            if values.len() != set.len() {
                return Err(GridError::Geometry(format!(
                    "{side} side produced {} values for {} faces",
                    values.len(),
                    set.len()
                )));
            }
            out.extend(values);
        }
        Ok(out)
    }

    fn site_sizes_along(&self, side: Side) -> Vec<f64> {
        let axis = if side.is_i_face() { self.site.y() } else { self.site.x() };
        axis.sizes().to_vec()
    }
}

fn layer_projectors(
    regional: &Grid,
    corners: &SiteCorners,
    set: &BoundaryFaceSet,
) -> Vec<LayerProjector> {
    let [nx, ny, _] = regional.dims();
    (corners.min[2]..=corners.max[2])
        .enumerate()
        .map(|(layer, k)| {
            let faces: Vec<usize> = set
                .faces
                .iter()
                .enumerate()
                .filter(|(_, f)| f.site_cell[2] == layer)
                .map(|(n, _)| n)
                .collect();
            let cells: Vec<CellIndex> = (0..nx * ny).map(|c| CellIndex::new(c + k * nx * ny)).collect();
            let points = cells
                .iter()
                .map(|c| {
                    let [i, j, k] = regional.ijk(*c);
                    regional.cell_center(i, j, k)
                })
                .collect();
            let targets: Vec<[f64; 3]> = faces.iter().map(|&n| set.faces[n].centroid).collect();
            let interp = ScatteredInterpolator::planar(points);
            let projector = PressureProjector::new(&interp, &targets, &[], false);
            LayerProjector {
                faces,
                cells,
                projector,
            }
        })
        .collect()
}

fn rotated_values(layers: &[LayerProjector], n_faces: usize, pressure: &[f64]) -> Vec<f64> {
    let mut values = vec![f64::NAN; n_faces];
    for layer in layers {
        let support: Vec<f64> = layer.cells.iter().map(|c| pressure[c.get()]).collect();
        for (n, p) in layer.faces.iter().zip(layer.projector.project(&support, &[])) {
            values[*n] = p.unwrap_or(f64::NAN);
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::{classify_regional_cells, conforming_face_sets, find_site_corners};
    use crate::grid::{AxisPartition, NestedGridSpec, NestedGrids};
    use crate::types::Footprint;

    const TOL: f64 = 1e-9;

    fn setup(rotation: Option<f64>) -> (NestedGrids, SiteCorners, SideBoundaries<BoundaryFaceSet>) {
        let g = NestedGrids::derive(&NestedGridSpec {
            regional_dims: [1000.0, 1000.0, 20.0],
            regional_partitions: [
                AxisPartition::Uniform(10),
                AxisPartition::Uniform(10),
                AxisPartition::Uniform(2),
            ],
            footprint: Footprint::new([300.0, 300.0, 0.0], [700.0, 700.0, 20.0]),
            site_cells: [8, 8, 2],
            rotation_deg: rotation,
        })
        .unwrap();
        let classes = classify_regional_cells(&g.regional, &g.footprint);
        let corners = find_site_corners(&classes, g.regional.dims()).unwrap();
        let faces = conforming_face_sets(&g.site, &g.regional, &corners, &g.ratio).unwrap();
        (g, corners, faces)
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(BoundaryKind::Pres2p.to_string(), "pres2p");
        assert!(BoundaryKind::Pres.is_pressure());
        assert!(!BoundaryKind::Flux.is_pressure());
        assert!(!BoundaryKind::Porvproj.has_face_values());
    }

    #[test]
    fn test_flux_step_replicates_to_fine_faces() {
        let (g, corners, faces) = setup(None);
        let proj = BoundaryProjection::new(
            BoundaryKind::Flux,
            &g.regional,
            &g.site,
            corners,
            g.ratio,
            &faces,
        )
        .unwrap();
        let n = g.regional.n_cells();
        let flux_j = vec![100.0 * 10.0; n];
        let flux_i = vec![0.0; n];
        let pressure = vec![0.0; n];
        let values = proj
            .project_step(&RegionalState {
                pressure: &pressure,
                flux_i: &flux_i,
                flux_j: &flux_j,
            })
            .unwrap();
        assert_eq!(values.len(), 4 * 16);
        // North inflow +1, South -1 per unit area; I faces carry nothing.
        assert!(values[..16].iter().all(|v| (v - 1.0).abs() < TOL));
        assert!(values[16..32].iter().all(|v| v.abs() < TOL));
        assert!(values[32..48].iter().all(|v| (v + 1.0).abs() < TOL));
    }

    #[test]
    fn test_rotated_pressure_uses_scattered_support() {
        let (g, corners, faces) = setup(Some(10.0));
        let proj = BoundaryProjection::new(
            BoundaryKind::Pres,
            &g.regional,
            &g.site,
            corners,
            g.ratio,
            &faces,
        )
        .unwrap();
        let pressure: Vec<f64> = (0..g.regional.n_cells())
            .map(|c| {
                let [i, j, k] = g.regional.ijk(c.into());
                let [x, y, _] = g.regional.cell_center(i, j, k);
                50.0 + 0.01 * x - 0.02 * y
            })
            .collect();
        let zero = vec![0.0; pressure.len()];
        let values = proj
            .project_step(&RegionalState {
                pressure: &pressure,
                flux_i: &zero,
                flux_j: &zero,
            })
            .unwrap();
        let all: Vec<_> = faces.iter().flat_map(|(_, s)| s.faces.iter()).collect();
        for (face, v) in all.iter().zip(&values) {
            let [x, y, _] = face.centroid;
            assert!((v - (50.0 + 0.01 * x - 0.02 * y)).abs() < 1e-6);
        }
    }
}
