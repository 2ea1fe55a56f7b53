//! Back-coupling from the site model to the regional model.
//!
//! - [`compute_multipliers`]: per-cell, per-direction transmissibility
//!   multipliers from the ratio of site to regional boundary fluxes
//! - [`BackCoupling`]: the run/project/run/correct iteration

mod backcoupling;
mod multipliers;

pub use backcoupling::{BackCoupling, CouplingModels, CouplingState, regional_name, site_name};
pub use multipliers::{CouplingGeometry, FluxTotals, MultiplierField, compute_multipliers};
