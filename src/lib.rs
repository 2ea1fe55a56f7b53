//! # expreccs
//!
//! Boundary conditions for a fine site reservoir model from a coarse regional
//! model of the same CO2 storage aquifer.
//!
//! This crate provides:
//! - Nested grid derivation (reference, regional, site) with optional site rotation
//! - Correspondence between regional cells and site boundary faces
//! - Flux, pressure and pore-volume projection onto the site boundary
//! - Report schedules and temporal resampling of projected values
//! - ECL binary archive reading, include-file and deck writing
//! - A back-coupling loop that corrects regional transmissibilities from site fluxes
//! - Projection onto externally built site decks
//!
//! The simulator itself is external; [`simulation::Simulator`] launches it.
//!
//! ```no_run
//! use std::path::Path;
//! use expreccs::config::ExpreccsConfig;
//! use expreccs::simulation::FlowSimulator;
//! use expreccs::workflow::{RunMode, backcoupling};
//!
//! # fn main() -> expreccs::Result<()> {
//! let config = ExpreccsConfig::from_file(Path::new("study.toml"))?;
//! let flow = FlowSimulator::from_config(&config.simulator);
//! let multipliers = backcoupling(&config, Path::new("output"), RunMode::All, &flow)?;
//! println!("corrected: {}", !multipliers.is_identity());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod correspondence;
pub mod coupling;
pub mod error;
pub mod given;
pub mod grid;
pub mod io;
pub mod projection;
pub mod simulation;
pub mod time;
pub mod types;
pub mod workflow;

pub use error::{Error, ErrorKind, Result};

pub use config::{ConfigError, ExpreccsConfig};
pub use correspondence::{NodeClass, SiteCorners, classify_regional_cells, find_site_corners};
pub use coupling::{BackCoupling, CouplingState, MultiplierField, compute_multipliers};
pub use given::{GivenOptions, project_given_decks};
pub use grid::{CornerPointGrid, Grid, GridKind, NestedGrids, RefinementRatio};
pub use io::{DeckRewriter, EclArchive, MemoryArchive, RestartLayout, SimulationArchive};
pub use projection::{BoundaryKind, BoundaryProjection, ScatteredInterpolator};
pub use simulation::{FlowSimulator, RunLayout, Simulator};
pub use time::{Schedule, TimeInterpolation, resample};
pub use types::{FaceDirection, LiquidPhase, Side, SideBoundaries};
pub use workflow::{RunMode, backcoupling, run_models};
