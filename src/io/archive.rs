//! Keyed array access to simulator output.

use std::collections::HashMap;

use super::ArchiveError;
use crate::grid::CornerPointGrid;

/// Read access to a finished simulation: grid, init arrays and per-step
/// restart arrays, all as `f64`.
///
/// Arrays come back as stored, which for most keywords means one value per
/// active cell. Use [`SimulationArchive::init_global`] and
/// [`SimulationArchive::restart_global`] for natural cell order.
pub trait SimulationArchive {
    /// Grid geometry.
    fn grid(&self) -> &CornerPointGrid;

    /// Report times in seconds, one per restart step.
    fn report_times(&self) -> &[f64];

    /// An `INIT` array.
    fn init_keyword(&self, keyword: &str) -> Result<Vec<f64>, ArchiveError>;

    /// A restart array at `step`.
    fn restart_keyword(&self, keyword: &str, step: usize) -> Result<Vec<f64>, ArchiveError>;

    /// Number of restart steps.
    fn n_steps(&self) -> usize {
        self.report_times().len()
    }

    /// An `INIT` array in natural cell order, inactive cells `0`.
    fn init_global(&self, keyword: &str) -> Result<Vec<f64>, ArchiveError> {
        let values = self.init_keyword(keyword)?;
        to_global(self.grid(), keyword, values)
    }

    /// A restart array in natural cell order, inactive cells `0`.
    fn restart_global(&self, keyword: &str, step: usize) -> Result<Vec<f64>, ArchiveError> {
        let values = self.restart_keyword(keyword, step)?;
        to_global(self.grid(), keyword, values)
    }

    /// An integer `INIT` array (region tags) in natural cell order.
    fn init_ints(&self, keyword: &str) -> Result<Vec<i32>, ArchiveError> {
        Ok(self
            .init_global(keyword)?
            .into_iter()
            .map(|v| v.round() as i32)
            .collect())
    }
}

fn to_global(grid: &CornerPointGrid, keyword: &str, values: Vec<f64>) -> Result<Vec<f64>, ArchiveError> {
    if values.len() == grid.n_cells() {
        return Ok(values);
    }
    grid.expand_active(&values, 0.0)
        .ok_or_else(|| ArchiveError::SizeMismatch {
            keyword: keyword.to_string(),
            found: values.len(),
            expected: grid.n_active(),
        })
}

/// Archive held in memory, for tests and for cases assembled in process.
///
/// # Example
///
/// ```
/// use expreccs::grid::{AxisPartition, CornerPointGrid, GridKind, build_grid};
/// use expreccs::io::{MemoryArchive, SimulationArchive};
///
/// let grid = build_grid(
///     GridKind::Regional,
///     [0.0; 3],
///     [10.0, 10.0, 1.0],
///     &[AxisPartition::Uniform(2), AxisPartition::Uniform(2), AxisPartition::Uniform(1)],
/// )
/// .unwrap();
/// let archive = MemoryArchive::new(CornerPointGrid::from_structured(&grid))
///     .with_init("PORV", vec![1.0; 4])
///     .with_step(0.0, [("PRESSURE", vec![100.0; 4])]);
///
/// assert_eq!(archive.n_steps(), 1);
/// assert_eq!(archive.restart_keyword("PRESSURE", 0).unwrap()[3], 100.0);
/// ```
#[derive(Clone, Debug)]
pub struct MemoryArchive {
    grid: CornerPointGrid,
    init: HashMap<String, Vec<f64>>,
    times: Vec<f64>,
    steps: Vec<HashMap<String, Vec<f64>>>,
}

impl MemoryArchive {
    /// Empty archive over `grid`.
    pub fn new(grid: CornerPointGrid) -> Self {
        Self {
            grid,
            init: HashMap::new(),
            times: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Add an `INIT` array.
    pub fn with_init(mut self, keyword: &str, values: Vec<f64>) -> Self {
        self.init.insert(keyword.to_string(), values);
        self
    }

    /// Append a restart step at `time` seconds.
    pub fn with_step<'k, I>(mut self, time: f64, arrays: I) -> Self
    where
        I: IntoIterator<Item = (&'k str, Vec<f64>)>,
    {
        self.push_step(time, arrays);
        self
    }

    /// Append a restart step in place.
    pub fn push_step<'k, I>(&mut self, time: f64, arrays: I)
    where
        I: IntoIterator<Item = (&'k str, Vec<f64>)>,
    {
        self.times.push(time);
        self.steps
            .push(arrays.into_iter().map(|(k, v)| (k.to_string(), v)).collect());
    }
}

impl SimulationArchive for MemoryArchive {
    fn grid(&self) -> &CornerPointGrid {
        &self.grid
    }

    fn report_times(&self) -> &[f64] {
        &self.times
    }

    fn init_keyword(&self, keyword: &str) -> Result<Vec<f64>, ArchiveError> {
        self.init
            .get(keyword)
            .cloned()
            .ok_or_else(|| ArchiveError::MissingKeyword {
                keyword: keyword.to_string(),
            })
    }

    fn restart_keyword(&self, keyword: &str, step: usize) -> Result<Vec<f64>, ArchiveError> {
        let arrays = self.steps.get(step).ok_or(ArchiveError::StepOutOfRange {
            step,
            available: self.steps.len(),
        })?;
        arrays
            .get(keyword)
            .cloned()
            .ok_or_else(|| ArchiveError::MissingKeyword {
                keyword: keyword.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{AxisPartition, GridKind, build_grid};

    fn grid_with_hole() -> CornerPointGrid {
        let g = build_grid(
            GridKind::Site,
            [0.0; 3],
            [3.0, 1.0, 1.0],
            &[
                AxisPartition::Uniform(3),
                AxisPartition::Uniform(1),
                AxisPartition::Uniform(1),
            ],
        )
        .unwrap();
        let full = CornerPointGrid::from_structured(&g);
        CornerPointGrid::from_arrays(
            full.dims(),
            full.coord().to_vec(),
            full.zcorn().to_vec(),
            Some(&[1, 0, 1]),
        )
        .unwrap()
    }

    #[test]
    fn test_active_arrays_expand() {
        let archive = MemoryArchive::new(grid_with_hole())
            .with_init("PORV", vec![2.0, 3.0])
            .with_init("FIPNUM", vec![1.0, 2.0])
            .with_step(0.0, [("PRESSURE", vec![10.0, 20.0])]);
        assert_eq!(archive.init_global("PORV").unwrap(), vec![2.0, 0.0, 3.0]);
        assert_eq!(archive.init_ints("FIPNUM").unwrap(), vec![1, 0, 2]);
        assert_eq!(archive.restart_global("PRESSURE", 0).unwrap(), vec![10.0, 0.0, 20.0]);
    }

    #[test]
    fn test_errors() {
        let archive = MemoryArchive::new(grid_with_hole())
            .with_init("DX", vec![1.0; 5])
            .with_step(0.0, [("PRESSURE", vec![1.0, 1.0])]);
        assert!(matches!(
            archive.init_global("DX"),
            Err(ArchiveError::SizeMismatch { found: 5, expected: 2, .. })
        ));
        assert!(matches!(
            archive.restart_keyword("PRESSURE", 3),
            Err(ArchiveError::StepOutOfRange { step: 3, available: 1 })
        ));
        assert!(matches!(
            archive.restart_keyword("SGAS", 0),
            Err(ArchiveError::MissingKeyword { .. })
        ));
    }
}
