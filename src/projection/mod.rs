//! Flux and pressure projection from the regional grid onto site faces.
//!
//! Fluxes are carried as densities (per unit face area, positive into the
//! site) and replicated onto refined faces. Pressures are in bar and come
//! from regular, two-point or scattered linear interpolation of regional
//! cell-center values.

mod boundary;
mod delaunay;
mod flux;
pub mod interpolate;
mod porv;
mod pressure;

pub use boundary::{BoundaryKind, BoundaryProjection, RegionalState};
pub use flux::{
    project_flux, regional_face_cells, regional_face_fluxes, replicate_along_side, restrict_flux,
};
pub use interpolate::{RegularGrid2D, ScatteredInterpolator, SimplexWeights};
pub use porv::{inner_side_porv, porv_projections, site_porv_multipliers};
pub use pressure::{
    FallbackPoint, GRAVITY, PASCAL_PER_BAR, PressureProjector, project_pressure,
    regular_side_pressures, two_point_pressures,
};
