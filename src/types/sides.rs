//! Lateral sides of a site model and per-side containers.
//!
//! Sides are named the way corner-point decks name the faces of a box:
//! `North` is the `J-` face (j = 0), `West` the `I` face (i = nx - 1),
//! `South` the `J` face (j = ny - 1) and `East` the `I-` face (i = 0).
//! The traversal order North, West, South, East is the order in which
//! boundary faces are numbered.

use std::fmt;

/// One lateral side of a structured grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    /// `J-` face, first row.
    North,
    /// `I` face, last column.
    West,
    /// `J` face, last row.
    South,
    /// `I-` face, first column.
    East,
}

impl Side {
    /// All sides in face-numbering order.
    pub const ALL: [Side; 4] = [Side::North, Side::West, Side::South, Side::East];

    /// Direction label used in `BCCON` rows.
    pub fn face_label(self) -> &'static str {
        match self {
            Side::North => "J-",
            Side::West => "I",
            Side::South => "J",
            Side::East => "I-",
        }
    }

    /// True when the side is normal to the i axis (faces vary along j).
    pub fn is_i_face(self) -> bool {
        matches!(self, Side::West | Side::East)
    }

    /// Sign turning the regional `+` flux of the boundary cell into inflow.
    ///
    /// North and East read the `+` flux of the cell just outside the site,
    /// which already points inward; South and West read the `+` flux of the
    /// last inside cell, which points outward.
    pub fn inflow_sign(self) -> f64 {
        match self {
            Side::North | Side::East => 1.0,
            Side::South | Side::West => -1.0,
        }
    }

    /// The `+` flux direction read for this side.
    pub fn flux_direction(self) -> FaceDirection {
        if self.is_i_face() {
            FaceDirection::XPlus
        } else {
            FaceDirection::YPlus
        }
    }

    /// Index in [`Side::ALL`].
    pub fn index(self) -> usize {
        match self {
            Side::North => 0,
            Side::West => 1,
            Side::South => 2,
            Side::East => 3,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Side::North => "north",
            Side::West => "west",
            Side::South => "south",
            Side::East => "east",
        };
        f.write_str(name)
    }
}

/// Lateral face direction of a cell, as used by flux output and
/// transmissibility multipliers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaceDirection {
    /// Face towards i + 1.
    XPlus,
    /// Face towards i - 1.
    XMinus,
    /// Face towards j + 1.
    YPlus,
    /// Face towards j - 1.
    YMinus,
}

impl FaceDirection {
    /// All lateral directions.
    pub const ALL: [FaceDirection; 4] = [
        FaceDirection::XPlus,
        FaceDirection::XMinus,
        FaceDirection::YPlus,
        FaceDirection::YMinus,
    ];

    /// Suffix of the simulator's directional flux keywords (`FLOWATI+`, ...).
    pub fn flux_suffix(self) -> &'static str {
        match self {
            FaceDirection::XPlus => "I+",
            FaceDirection::XMinus => "I-",
            FaceDirection::YPlus => "J+",
            FaceDirection::YMinus => "J-",
        }
    }

    /// Transmissibility multiplier keyword.
    pub fn multiplier_keyword(self) -> &'static str {
        match self {
            FaceDirection::XPlus => "MULTX",
            FaceDirection::XMinus => "MULTX-",
            FaceDirection::YPlus => "MULTY",
            FaceDirection::YMinus => "MULTY-",
        }
    }

    /// True for `I+`/`I-`.
    pub fn is_x(self) -> bool {
        matches!(self, FaceDirection::XPlus | FaceDirection::XMinus)
    }

    /// True for the `+` directions.
    pub fn is_plus(self) -> bool {
        matches!(self, FaceDirection::XPlus | FaceDirection::YPlus)
    }
}

/// Per-side values with named fields.
///
/// # Example
///
/// ```
/// use expreccs::types::{Side, SideBoundaries};
///
/// let counts = SideBoundaries::new(4, 6, 4, 6);
/// assert_eq!(*counts.get(Side::West), 6);
/// assert_eq!(counts.iter().map(|(_, n)| n).sum::<i32>(), 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SideBoundaries<T> {
    /// `J-` side.
    pub north: T,
    /// `I` side.
    pub west: T,
    /// `J` side.
    pub south: T,
    /// `I-` side.
    pub east: T,
}

impl<T> SideBoundaries<T> {
    /// Create from explicit values in face-numbering order.
    pub fn new(north: T, west: T, south: T, east: T) -> Self {
        Self {
            north,
            west,
            south,
            east,
        }
    }

    /// Same value on all sides.
    pub fn uniform(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            north: value.clone(),
            west: value.clone(),
            south: value.clone(),
            east: value,
        }
    }

    /// Build by evaluating `f` for each side.
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(Side) -> T,
    {
        Self {
            north: f(Side::North),
            west: f(Side::West),
            south: f(Side::South),
            east: f(Side::East),
        }
    }

    /// Fallible variant of [`SideBoundaries::from_fn`].
    pub fn try_from_fn<E, F>(mut f: F) -> Result<Self, E>
    where
        F: FnMut(Side) -> Result<T, E>,
    {
        Ok(Self {
            north: f(Side::North)?,
            west: f(Side::West)?,
            south: f(Side::South)?,
            east: f(Side::East)?,
        })
    }

    /// Map a function over all sides.
    pub fn map<U, F>(self, mut f: F) -> SideBoundaries<U>
    where
        F: FnMut(T) -> U,
    {
        SideBoundaries {
            north: f(self.north),
            west: f(self.west),
            south: f(self.south),
            east: f(self.east),
        }
    }

    /// Map a function over references to all sides.
    pub fn map_ref<U, F>(&self, mut f: F) -> SideBoundaries<U>
    where
        F: FnMut(&T) -> U,
    {
        SideBoundaries {
            north: f(&self.north),
            west: f(&self.west),
            south: f(&self.south),
            east: f(&self.east),
        }
    }

    /// Value for one side.
    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::North => &self.north,
            Side::West => &self.west,
            Side::South => &self.south,
            Side::East => &self.east,
        }
    }

    /// Mutable value for one side.
    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::North => &mut self.north,
            Side::West => &mut self.west,
            Side::South => &mut self.south,
            Side::East => &mut self.east,
        }
    }

    /// Iterate in face-numbering order.
    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        [
            (Side::North, &self.north),
            (Side::West, &self.west),
            (Side::South, &self.south),
            (Side::East, &self.east),
        ]
        .into_iter()
    }

    /// Convert to array `[north, west, south, east]`.
    pub fn to_array(self) -> [T; 4] {
        [self.north, self.west, self.south, self.east]
    }

    /// Create from array `[north, west, south, east]`.
    pub fn from_array([north, west, south, east]: [T; 4]) -> Self {
        Self::new(north, west, south, east)
    }
}

impl<T: Default> Default for SideBoundaries<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T: fmt::Display> fmt::Display for SideBoundaries<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N:{} W:{} S:{} E:{}",
            self.north, self.west, self.south, self.east
        )
    }
}

impl<T> From<[T; 4]> for SideBoundaries<T> {
    fn from(arr: [T; 4]) -> Self {
        Self::from_array(arr)
    }
}
