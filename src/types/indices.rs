//! Strongly-typed index newtypes.
//!
//! These types keep natural-order cell indices, active-cell indices and
//! boundary face ids apart.

use std::fmt;

macro_rules! define_index {
    (
        $(#[$meta:meta])*
        $name:ident, $display_prefix:literal
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Create a new index.
            #[inline]
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            /// Get the raw index value.
            #[inline]
            pub const fn get(self) -> usize {
                self.0
            }

            /// Iterate over `[0, n)`.
            pub fn iter(n: usize) -> impl ExactSizeIterator<Item = $name> {
                (0..n).map($name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $display_prefix, self.0)
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(index: usize) -> Self {
                Self(index)
            }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(idx: $name) -> usize {
                idx.0
            }
        }

        impl<T> std::ops::Index<$name> for [T] {
            type Output = T;
            #[inline]
            fn index(&self, idx: $name) -> &T {
                &self[idx.0]
            }
        }

        impl<T> std::ops::Index<$name> for Vec<T> {
            type Output = T;
            #[inline]
            fn index(&self, idx: $name) -> &T {
                &self[idx.0]
            }
        }

        impl<T> std::ops::IndexMut<$name> for Vec<T> {
            #[inline]
            fn index_mut(&mut self, idx: $name) -> &mut T {
                &mut self[idx.0]
            }
        }
    };
}

define_index!(
    /// Natural-order cell index `i + j*nx + k*nx*ny`.
    ///
    /// ```
    /// use expreccs::types::CellIndex;
    ///
    /// let c = CellIndex::new(42);
    /// assert_eq!(c.get(), 42);
    /// assert_eq!(c.to_string(), "C42");
    /// ```
    CellIndex,
    "C"
);

define_index!(
    /// Index into arrays that only hold active cells.
    ActiveIndex,
    "A"
);

define_index!(
    /// Zero-based boundary face id. Written one-based in `BCCON`/`BCPROP`.
    FaceId,
    "F"
);

impl FaceId {
    /// One-based id as it appears in include files.
    pub fn deck_id(self) -> usize {
        self.0 + 1
    }
}
