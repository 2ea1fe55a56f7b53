//! One-dimensional axis partitions.
//!
//! An axis is a partition of `[origin, origin + extent]` into cells, stored as
//! cell edges (`n + 1` values), midpoints and sizes.

use serde::Deserialize;

use super::GridError;

/// A run of `count` cells of equal `size`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct CellRun {
    /// Number of cells in the run.
    pub count: usize,
    /// Cell size in meters.
    pub size: f64,
}

/// How an axis is subdivided.
#[derive(Clone, Debug, PartialEq)]
pub enum AxisPartition {
    /// `n` equal cells spanning the extent.
    Uniform(usize),
    /// Ordered run-length list of `(count, size)` pairs.
    Runs(Vec<CellRun>),
    /// Literal layer thicknesses; `declared` is the layer count the grid
    /// header promises and must equal `thicknesses.len()`.
    Layers {
        /// One thickness per layer, top down.
        thicknesses: Vec<f64>,
        /// Declared number of layers.
        declared: usize,
    },
}

/// Relative tolerance when checking that partitions fill their extent.
const EXTENT_RTOL: f64 = 1e-6;

/// A partitioned axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Axis {
    edges: Vec<f64>,
    midpoints: Vec<f64>,
    sizes: Vec<f64>,
}

impl Axis {
    /// Build an axis from a partition.
    ///
    /// `name` only labels errors.
    pub fn build(
        name: char,
        origin: f64,
        extent: f64,
        partition: &AxisPartition,
    ) -> Result<Self, GridError> {
        let invalid = |reason: String| GridError::InvalidPartition { axis: name, reason };
        if !(extent > 0.0) {
            return Err(invalid(format!("extent must be positive, got {}", extent)));
        }
        let sizes = match partition {
            AxisPartition::Uniform(n) => {
                if *n == 0 {
                    return Err(invalid("cell count must be positive".into()));
                }
                vec![extent / *n as f64; *n]
            }
            AxisPartition::Runs(runs) => {
                if runs.is_empty() {
                    return Err(invalid("empty run list".into()));
                }
                let mut sizes = Vec::new();
                for run in runs {
                    if run.count == 0 || !(run.size > 0.0) {
                        return Err(invalid(format!(
                            "run ({}, {}) needs a positive count and size",
                            run.count, run.size
                        )));
                    }
                    sizes.extend(std::iter::repeat_n(run.size, run.count));
                }
                sizes
            }
            AxisPartition::Layers {
                thicknesses,
                declared,
            } => {
                if thicknesses.len() != *declared {
                    return Err(invalid(format!(
                        "{} layer thicknesses given for {} declared layers",
                        thicknesses.len(),
                        declared
                    )));
                }
                if *declared == 0 || thicknesses.iter().any(|t| !(*t > 0.0)) {
                    return Err(invalid("layer thicknesses must be positive".into()));
                }
                thicknesses.clone()
            }
        };

        let total: f64 = sizes.iter().sum();
        if (total - extent).abs() > EXTENT_RTOL * extent {
            return Err(invalid(format!(
                "cells sum to {} but the extent is {}",
                total, extent
            )));
        }
        Ok(Self::from_sizes(origin, sizes))
    }

    /// Uniform axis with `n` cells.
    pub fn uniform(origin: f64, extent: f64, n: usize) -> Result<Self, GridError> {
        Self::build('?', origin, extent, &AxisPartition::Uniform(n))
    }

    fn from_sizes(origin: f64, sizes: Vec<f64>) -> Self {
        let mut edges = Vec::with_capacity(sizes.len() + 1);
        edges.push(origin);
        let mut acc = origin;
        for s in &sizes {
            acc += s;
            edges.push(acc);
        }
        let midpoints = edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
        Self {
            edges,
            midpoints,
            sizes,
        }
    }

    /// Number of cells.
    pub fn n_cells(&self) -> usize {
        self.sizes.len()
    }

    /// Cell edges, `n_cells + 1` values.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Cell midpoints.
    pub fn midpoints(&self) -> &[f64] {
        &self.midpoints
    }

    /// Cell sizes.
    pub fn sizes(&self) -> &[f64] {
        &self.sizes
    }

    /// First edge.
    pub fn start(&self) -> f64 {
        self.edges[0]
    }

    /// Last edge.
    pub fn end(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Cell whose midpoint is closest to `coord` (first one on ties).
    pub fn nearest_cell(&self, coord: f64) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, m) in self.midpoints.iter().enumerate() {
            let d = (m - coord).abs();
            if d < best_dist {
                best = i;
                best_dist = d;
            }
        }
        best
    }

    /// Cell containing `coord`, or `None` outside the axis.
    ///
    /// Interior edges belong to the lower cell.
    pub fn locate(&self, coord: f64) -> Option<usize> {
        if coord < self.start() || coord > self.end() {
            return None;
        }
        let pos = self.edges.partition_point(|e| *e < coord);
        Some(pos.saturating_sub(1).min(self.n_cells() - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    fn check_invariants(axis: &Axis) {
        assert_eq!(axis.edges().len(), axis.n_cells() + 1);
        assert_eq!(axis.midpoints().len(), axis.n_cells());
        for i in 0..axis.n_cells() {
            let mid = 0.5 * (axis.edges()[i] + axis.edges()[i + 1]);
            assert!((axis.midpoints()[i] - mid).abs() < TOL);
            let size = axis.edges()[i + 1] - axis.edges()[i];
            assert!((axis.sizes()[i] - size).abs() < 1e-9);
        }
    }

    #[test]
    fn test_uniform_axis() {
        let axis = Axis::uniform(0.0, 10.0, 4).unwrap();
        check_invariants(&axis);
        assert_eq!(axis.edges(), &[0.0, 2.5, 5.0, 7.5, 10.0]);
        assert_eq!(axis.midpoints()[0], 1.25);
    }

    #[test]
    fn test_runs_axis() {
        let runs = vec![
            CellRun { count: 2, size: 10.0 },
            CellRun { count: 3, size: 5.0 },
        ];
        let axis = Axis::build('x', 100.0, 35.0, &AxisPartition::Runs(runs)).unwrap();
        check_invariants(&axis);
        assert_eq!(axis.n_cells(), 5);
        assert!((axis.end() - 135.0).abs() < TOL);
        assert!((axis.midpoints()[2] - 122.5).abs() < TOL);
    }

    #[test]
    fn test_layers_are_placed_at_cumulative_thickness() {
        let partition = AxisPartition::Layers {
            thicknesses: vec![5.0, 15.0, 30.0],
            declared: 3,
        };
        let axis = Axis::build('z', 1000.0, 50.0, &partition).unwrap();
        check_invariants(&axis);
        assert_eq!(axis.edges(), &[1000.0, 1005.0, 1020.0, 1050.0]);
    }

    #[test]
    fn test_malformed_partitions() {
        assert!(matches!(
            Axis::build('x', 0.0, 1.0, &AxisPartition::Uniform(0)),
            Err(GridError::InvalidPartition { axis: 'x', .. })
        ));
        let layers = AxisPartition::Layers {
            thicknesses: vec![1.0, 1.0],
            declared: 3,
        };
        assert!(Axis::build('z', 0.0, 2.0, &layers).is_err());
        let runs = AxisPartition::Runs(vec![CellRun { count: 2, size: 1.0 }]);
        assert!(Axis::build('y', 0.0, 3.0, &runs).is_err());
    }

    #[test]
    fn test_nearest_and_locate() {
        let axis = Axis::uniform(0.0, 10.0, 10).unwrap();
        assert_eq!(axis.nearest_cell(2.9), 2);
        assert_eq!(axis.nearest_cell(3.4), 3);
        assert_eq!(axis.nearest_cell(-5.0), 0);
        assert_eq!(axis.locate(3.0), Some(2));
        assert_eq!(axis.locate(0.0), Some(0));
        assert_eq!(axis.locate(10.0), Some(9));
        assert_eq!(axis.locate(10.5), None);
    }
}
