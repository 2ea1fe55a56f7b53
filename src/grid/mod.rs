//! Grid geometry index.
//!
//! Per-axis cell edges, midpoints and sizes for the reference, regional and
//! site grids, the derivation that keeps them consistent, an optional rigid
//! rotation of the site, and corner-point grids read back from `EGRID`.
//!
//! # Example
//!
//! ```
//! use expreccs::grid::{AxisPartition, NestedGridSpec, NestedGrids};
//! use expreccs::types::Footprint;
//!
//! let grids = NestedGrids::derive(&NestedGridSpec {
//!     regional_dims: [1000.0, 1000.0, 20.0],
//!     regional_partitions: [
//!         AxisPartition::Uniform(10),
//!         AxisPartition::Uniform(10),
//!         AxisPartition::Uniform(2),
//!     ],
//!     footprint: Footprint::new([300.0, 300.0, 0.0], [700.0, 700.0, 20.0]),
//!     site_cells: [8, 8, 2],
//!     rotation_deg: None,
//! })
//! .unwrap();
//! assert_eq!(grids.reference.dims(), [20, 20, 2]);
//! assert_eq!(grids.ratio.x, 2);
//! ```

mod axis;
mod corner_point;
mod nested;
mod rotation;
mod structured;

pub use axis::{Axis, AxisPartition, CellRun};
pub use corner_point::CornerPointGrid;
pub use nested::{NestedGridSpec, NestedGrids, RefinementRatio};
pub use rotation::SiteRotation;
pub use structured::{Grid, GridKind, build_grid};

use thiserror::Error;

use crate::types::Side;

/// Errors from grid construction and geometric preconditions.
#[derive(Debug, Error)]
pub enum GridError {
    /// Malformed partition or inconsistent cell counts.
    #[error("invalid {axis} partition: {reason}")]
    InvalidPartition {
        /// Axis name.
        axis: char,
        /// What is wrong.
        reason: String,
    },

    /// No regional cell lies inside the site footprint.
    #[error("site footprint does not contain any regional cell")]
    EmptyFootprint,

    /// Site layers subdivide regional layers.
    #[error("vertical refinement ratio {ratio} is not supported")]
    UnsupportedVerticalRefinement {
        /// Site layers per regional layer.
        ratio: usize,
    },

    /// The site touches the domain edge, leaving no regional cell outside it.
    #[error("site footprint reaches the regional domain edge on the {side} side")]
    FootprintTouchesDomainEdge {
        /// Offending side.
        side: Side,
    },

    /// Inconsistent geometry arrays or counts.
    #[error("inconsistent grid geometry: {0}")]
    Geometry(String),
}

impl GridError {
    /// True for errors caused by the configuration rather than geometry.
    pub fn is_configuration(&self) -> bool {
        matches!(self, GridError::InvalidPartition { .. })
    }
}
