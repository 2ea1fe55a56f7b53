//! Strongly-typed domain types shared across the crate.
//!
//! - **Named sides over positional arrays**: `SideBoundaries { north, west, south, east }`
//! - **Index newtypes**: natural cell order, active cells and face ids cannot be mixed up
//! - **Phase enum**: flux and density keywords are resolved once
//!
//! # Example
//!
//! ```
//! use expreccs::types::{Footprint, LiquidPhase, Side, SideBoundaries};
//!
//! let site = Footprint::new([300.0, 300.0, 0.0], [700.0, 700.0, 20.0]);
//! assert_eq!(site.center_xy(), (500.0, 500.0));
//!
//! let labels = SideBoundaries::from_fn(Side::face_label);
//! assert_eq!(labels.north, "J-");
//!
//! let kw = LiquidPhase::Water.keywords();
//! assert_eq!(kw.density(), "WAT_DEN");
//! ```

mod bounds;
mod indices;
mod phase;
mod sides;

pub use bounds::Footprint;
pub use indices::{ActiveIndex, CellIndex, FaceId};
pub use phase::{LiquidPhase, PhaseKeywords};
pub use sides::{FaceDirection, Side, SideBoundaries};
