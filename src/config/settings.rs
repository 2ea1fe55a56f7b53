//! Raw TOML tables and their validated counterparts.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;
use crate::grid::{AxisPartition, CellRun, NestedGridSpec, NestedGrids};
use crate::io::RestartLayout;
use crate::projection::BoundaryKind;
use crate::time::{
    InjectionPeriod, PerStep, Schedule, ScheduleError, TimeInterpolation, regional_schedule,
    site_schedule,
};
use crate::types::{Footprint, LiquidPhase};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    simulator: RawSimulator,
    grid: Option<RawGrid>,
    schedule: Option<RawSchedule>,
    #[serde(default)]
    boundary: RawBoundary,
    #[serde(default)]
    coupling: RawCoupling,
    #[serde(default)]
    decks: RawDecks,
    #[serde(default)]
    wells: Vec<[f64; 3]>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSimulator {
    executable: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    restart_layout: RestartLayout,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGrid {
    regional_dims: Option<[f64; 3]>,
    regional_cells: Option<[usize; 3]>,
    site_location: Option<[f64; 6]>,
    site_cells: Option<[usize; 3]>,
    regional_thicknesses: Option<Vec<f64>>,
    rotation: Option<f64>,
    partition_x: Option<Vec<CellRun>>,
    partition_y: Option<Vec<CellRun>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSchedule {
    injection: Option<Vec<[f64; 3]>>,
    #[serde(default)]
    time_interp: TimeInterpolation,
    frequency: Option<PerStep<usize>>,
    telescoping: Option<PerStep<f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBoundary {
    #[serde(default)]
    kind: BoundaryKind,
    #[serde(default)]
    phase: LiquidPhase,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCoupling {
    #[serde(default)]
    iterations: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDecks {
    reference: Option<PathBuf>,
    regional: Option<PathBuf>,
    site: Option<PathBuf>,
}

/// External simulator invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatorConfig {
    /// Program name or path.
    pub executable: String,
    /// Extra flags placed before `--output-dir`.
    pub args: Vec<String>,
    /// How restart files are laid out on disk.
    pub restart_layout: RestartLayout,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            executable: "flow".to_string(),
            args: Vec::new(),
            restart_layout: RestartLayout::Unified,
        }
    }
}

/// Report schedules of the study.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleConfig {
    /// Injection periods.
    pub periods: Vec<InjectionPeriod>,
    /// Transfer of regional values to site times.
    pub time_interp: TimeInterpolation,
    /// Site sub-steps per regional step; `None` uses the periods' site step.
    pub frequency: Option<PerStep<usize>>,
    /// Telescoping coefficient per regional step.
    pub telescoping: PerStep<f64>,
}

impl ScheduleConfig {
    /// Regional report schedule.
    pub fn regional(&self) -> Result<Schedule, ScheduleError> {
        regional_schedule(&self.periods)
    }

    /// Site report schedule.
    pub fn site(&self) -> Result<Schedule, ScheduleError> {
        match &self.frequency {
            Some(frequency) => self.regional()?.refine(frequency, &self.telescoping),
            None => site_schedule(&self.periods),
        }
    }
}

/// Template decks per model, resolved against the configuration file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeckTemplates {
    /// Reference model deck.
    pub reference: Option<PathBuf>,
    /// Regional model deck.
    pub regional: Option<PathBuf>,
    /// Site model deck.
    pub site: Option<PathBuf>,
}

/// Validated study configuration.
#[derive(Clone, Debug)]
pub struct ExpreccsConfig {
    /// Simulator settings.
    pub simulator: SimulatorConfig,
    /// Grid description.
    pub grid: NestedGridSpec,
    /// Schedules.
    pub schedule: ScheduleConfig,
    /// Site boundary treatment.
    pub boundary: BoundaryKind,
    /// Liquid phase read from the archives.
    pub phase: LiquidPhase,
    /// Back-coupling iterations.
    pub iterations: usize,
    /// Template decks.
    pub decks: DeckTemplates,
    /// Injector coordinates.
    pub wells: Vec<[f64; 3]>,
}

impl ExpreccsConfig {
    /// Load and validate a TOML file. Relative deck paths are taken from the
    /// file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or(Path::new(""));
        let config = validate(raw, base)?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate TOML text. Relative deck paths stay relative.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: PathBuf::from("<string>"),
            source,
        })?;
        validate(raw, Path::new(""))
    }

    /// Derive the reference, regional and site grids.
    pub fn nested_grids(&self) -> Result<NestedGrids, crate::grid::GridError> {
        NestedGrids::derive(&self.grid)
    }
}

fn require<T>(value: Option<T>, key: &str) -> Result<T, ConfigError> {
    value.ok_or_else(|| ConfigError::Missing(key.to_string()))
}

fn validate_grid(raw: RawGrid) -> Result<NestedGridSpec, ConfigError> {
    let dims = require(raw.regional_dims, "grid.regional_dims")?;
    let cells = require(raw.regional_cells, "grid.regional_cells")?;
    let location = require(raw.site_location, "grid.site_location")?;
    let site_cells = require(raw.site_cells, "grid.site_cells")?;

    if dims.iter().any(|d| !(*d > 0.0)) {
        return Err(ConfigError::invalid("grid.regional_dims", "extents must be positive"));
    }
    if cells.contains(&0) {
        return Err(ConfigError::invalid("grid.regional_cells", "cell counts must be positive"));
    }
    if site_cells.contains(&0) {
        return Err(ConfigError::invalid("grid.site_cells", "cell counts must be positive"));
    }
    let footprint = Footprint::from_location(location)
        .ok_or_else(|| ConfigError::invalid("grid.site_location", "empty site box"))?;
    if (0..3).any(|d| footprint.min[d] < 0.0 || footprint.max[d] > dims[d]) {
        return Err(ConfigError::invalid(
            "grid.site_location",
            format!("site box {footprint} exceeds the regional domain"),
        ));
    }

    for (key, runs, n) in [
        ("grid.partition_x", &raw.partition_x, cells[0]),
        ("grid.partition_y", &raw.partition_y, cells[1]),
    ] {
        let total: usize = runs.iter().flatten().map(|r| r.count).sum();
        if runs.is_some() && total != n {
            return Err(ConfigError::invalid(key, format!("{total} cells but {n} declared")));
        }
    }
    let lateral = |runs: Option<Vec<CellRun>>, n: usize| match runs {
        Some(runs) => AxisPartition::Runs(runs),
        None => AxisPartition::Uniform(n),
    };
    let vertical = match raw.regional_thicknesses {
        Some(thicknesses) => AxisPartition::Layers {
            thicknesses,
            declared: cells[2],
        },
        None => AxisPartition::Uniform(cells[2]),
    };
    let spec = NestedGridSpec {
        regional_dims: dims,
        regional_partitions: [
            lateral(raw.partition_x, cells[0]),
            lateral(raw.partition_y, cells[1]),
            vertical,
        ],
        footprint,
        site_cells,
        rotation_deg: raw.rotation.filter(|a| *a != 0.0),
    };
    // Partition and refinement errors surface here, before any run.
    let grids = NestedGrids::derive(&spec).map_err(|e| ConfigError::invalid("grid", e.to_string()))?;
    tracing::debug!(ratio = ?grids.ratio, "grid configuration validated");
    Ok(spec)
}

fn validate_schedule(raw: RawSchedule) -> Result<ScheduleConfig, ConfigError> {
    let rows = require(raw.injection, "schedule.injection")?;
    if rows.is_empty() {
        return Err(ConfigError::invalid("schedule.injection", "no injection periods"));
    }
    let schedule = ScheduleConfig {
        periods: rows.into_iter().map(InjectionPeriod::from_row).collect(),
        time_interp: raw.time_interp,
        frequency: raw.frequency,
        telescoping: raw.telescoping.unwrap_or(PerStep::Scalar(0.0)),
    };
    schedule
        .regional()
        .map_err(|e| ConfigError::invalid("schedule.injection", e.to_string()))?;
    schedule
        .site()
        .map_err(|e| ConfigError::invalid("schedule", e.to_string()))?;
    Ok(schedule)
}

fn resolve(base: &Path, path: Option<PathBuf>) -> Option<PathBuf> {
    path.map(|p| if p.is_absolute() { p } else { base.join(p) })
}

fn validate(raw: RawConfig, base: &Path) -> Result<ExpreccsConfig, ConfigError> {
    let grid = validate_grid(require(raw.grid, "grid")?)?;
    let schedule = validate_schedule(require(raw.schedule, "schedule")?)?;

    for (n, w) in raw.wells.iter().enumerate() {
        if (0..3).any(|d| w[d] < 0.0 || w[d] > grid.regional_dims[d]) {
            return Err(ConfigError::invalid(
                "wells",
                format!("well {n} at {w:?} lies outside the regional domain"),
            ));
        }
    }

    let executable = raw.simulator.executable.unwrap_or_else(|| "flow".to_string());
    if executable.trim().is_empty() {
        return Err(ConfigError::invalid("simulator.executable", "empty program name"));
    }

    Ok(ExpreccsConfig {
        simulator: SimulatorConfig {
            executable,
            args: raw.simulator.args,
            restart_layout: raw.simulator.restart_layout,
        },
        grid,
        schedule,
        boundary: raw.boundary.kind,
        phase: raw.boundary.phase,
        iterations: raw.coupling.iterations,
        decks: DeckTemplates {
            reference: resolve(base, raw.decks.reference),
            regional: resolve(base, raw.decks.regional),
            site: resolve(base, raw.decks.site),
        },
        wells: raw.wells,
    })
}
