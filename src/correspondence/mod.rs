//! Spatial correspondence between regional cells and site boundary faces.
//!
//! - [`classify_regional_cells`]: nine-class segmentation around the footprint
//! - [`find_site_corners`]: regional index box under the site
//! - [`conforming_face_sets`]: face sets for co-generated grids, by index
//! - [`match_boundary`]: face sets for independently built grids, by nearest
//!   cell and border crossing
//! - [`PointIndex`]: R-tree nearest-cell queries in Manhattan distance

mod classify;
mod corners;
pub mod geometry;
mod matching;
mod spatial;

pub use classify::{NodeClass, classify_regional_cells, inside_mask};
pub use corners::{
    BoundaryFace, BoundaryFaceSet, SiteCorners, conforming_face_sets, find_site_corners,
    side_cells,
};
pub use matching::{
    MatchOptions, SideMatch, SupportPoint, border_segment, match_boundary, support_jitter,
};
pub use spatial::PointIndex;
