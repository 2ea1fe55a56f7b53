//! Site footprint bounds.

use std::fmt;

/// Axis-aligned site box in regional physical coordinates.
///
/// # Example
///
/// ```
/// use expreccs::types::Footprint;
///
/// let site = Footprint::new([300.0, 300.0, 0.0], [700.0, 700.0, 20.0]);
/// assert_eq!(site.width(), 400.0);
/// assert!(site.contains(500.0, 500.0, 10.0));
/// assert!(!site.contains(300.0, 500.0, 10.0)); // lower bound is open
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    /// Lower corner (x, y, z).
    pub min: [f64; 3],
    /// Upper corner (x, y, z).
    pub max: [f64; 3],
}

impl Footprint {
    /// Create a footprint.
    ///
    /// # Panics
    ///
    /// Panics if any upper coordinate is not greater than the lower one.
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        for d in 0..3 {
            assert!(
                max[d] > min[d],
                "footprint axis {} is empty: [{}, {}]",
                d,
                min[d],
                max[d]
            );
        }
        Self { min, max }
    }

    /// Parse the `[xmin, ymin, zmin, xmax, ymax, zmax]` layout.
    ///
    /// Returns `None` when an axis is empty.
    pub fn from_location(location: [f64; 6]) -> Option<Self> {
        let min = [location[0], location[1], location[2]];
        let max = [location[3], location[4], location[5]];
        (0..3).all(|d| max[d] > min[d]).then_some(Self { min, max })
    }

    /// Extent along x.
    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    /// Extent along y.
    pub fn length(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    /// Extent along z.
    pub fn thickness(&self) -> f64 {
        self.max[2] - self.min[2]
    }

    /// Extents along all axes.
    pub fn extents(&self) -> [f64; 3] {
        [self.width(), self.length(), self.thickness()]
    }

    /// Horizontal center.
    pub fn center_xy(&self) -> (f64, f64) {
        (
            0.5 * (self.min[0] + self.max[0]),
            0.5 * (self.min[1] + self.max[1]),
        )
    }

    /// Half-open `(min, max]` containment on every axis.
    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        let p = [x, y, z];
        (0..3).all(|d| p[d] > self.min[d] && p[d] <= self.max[d])
    }
}

impl fmt::Display for Footprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] x [{}, {}] x [{}, {}]",
            self.min[0], self.max[0], self.min[1], self.max[1], self.min[2], self.max[2]
        )
    }
}
