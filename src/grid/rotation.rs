//! Rigid rotation of the site grid in the horizontal plane.

use crate::types::Footprint;

/// Counter-clockwise rotation by a fixed angle about a center point.
///
/// # Example
///
/// ```
/// use expreccs::grid::SiteRotation;
///
/// let rot = SiteRotation::new(90.0, (0.0, 0.0));
/// let (x, y) = rot.apply(1.0, 0.0);
/// assert!((x - 0.0).abs() < 1e-12 && (y - 1.0).abs() < 1e-12);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SiteRotation {
    angle_deg: f64,
    cos: f64,
    sin: f64,
    center: (f64, f64),
}

impl SiteRotation {
    /// Rotation by `angle_deg` degrees about `center`.
    pub fn new(angle_deg: f64, center: (f64, f64)) -> Self {
        let rad = angle_deg.to_radians();
        Self {
            angle_deg,
            cos: rad.cos(),
            sin: rad.sin(),
            center,
        }
    }

    /// Rotation about the horizontal center of the site footprint.
    pub fn about_footprint(angle_deg: f64, footprint: &Footprint) -> Self {
        Self::new(angle_deg, footprint.center_xy())
    }

    /// Angle in degrees.
    pub fn angle_deg(&self) -> f64 {
        self.angle_deg
    }

    /// Rotation center.
    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    /// True when the rotation leaves every point in place.
    pub fn is_identity(&self) -> bool {
        self.angle_deg.rem_euclid(360.0) == 0.0
    }

    /// Rotate a point.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let (dx, dy) = (x - self.center.0, y - self.center.1);
        (
            self.center.0 + self.cos * dx - self.sin * dy,
            self.center.1 + self.sin * dx + self.cos * dy,
        )
    }

    /// Undo [`SiteRotation::apply`].
    pub fn invert(&self, x: f64, y: f64) -> (f64, f64) {
        let (dx, dy) = (x - self.center.0, y - self.center.1);
        (
            self.center.0 + self.cos * dx + self.sin * dy,
            self.center.1 - self.sin * dx + self.cos * dy,
        )
    }
}
