//! Study driver: decks, simulator runs and boundary conditions for the
//! reference, regional and site models.
//!
//! [`run_models`] runs each model once. [`backcoupling`] iterates the
//! regional and site models with transmissibility corrections. Both write
//! under a [`RunLayout`] and take their template decks from the
//! configuration; the templates provide everything except grid geometry,
//! region tags, multipliers, boundary conditions and report steps.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::{ConfigError, ExpreccsConfig};
use crate::correspondence::{
    BoundaryFaceSet, NodeClass, SiteCorners, classify_regional_cells, conforming_face_sets,
    find_site_corners, inside_mask,
};
use crate::coupling::{BackCoupling, CouplingGeometry, CouplingModels, MultiplierField};
use crate::error::Result;
use crate::grid::{Grid, GridKind, NestedGrids};
use crate::io::{
    BcconRow, BcpropKind, DeckRewriter, EclArchive, SimulationArchive, write_bccon_file,
    write_bcprop_file, write_int_include, write_real_include,
};
use crate::projection::{
    BoundaryKind, BoundaryProjection, RegionalState, inner_side_porv, porv_projections,
    site_porv_multipliers,
};
use crate::simulation::{RunLayout, RunRequest, Simulator, run_batch};
use crate::time::{Schedule, report_series, resample};
use crate::types::{FaceDirection, SideBoundaries};

/// Which models [`run_models`] launches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Reference, regional and site.
    #[default]
    All,
    /// Reference only.
    Reference,
    /// Regional only.
    Regional,
    /// Site only, from an existing regional run.
    Site,
    /// Regional and site.
    NoReference,
    /// Write decks without running anything.
    None,
}

impl RunMode {
    fn reference(self) -> bool {
        matches!(self, RunMode::All | RunMode::Reference)
    }

    fn regional(self) -> bool {
        matches!(self, RunMode::All | RunMode::Regional | RunMode::NoReference)
    }

    fn site(self) -> bool {
        matches!(self, RunMode::All | RunMode::Site | RunMode::NoReference)
    }

    /// Template decks this mode writes; back-coupling also runs the site.
    pub fn templates(self, coupled: bool) -> Vec<GridKind> {
        let none = self == RunMode::None;
        let mut kinds = Vec::new();
        if self.reference() || none {
            kinds.push(GridKind::Reference);
        }
        if self.regional() || none {
            kinds.push(GridKind::Regional);
        }
        if self.site() || (coupled && self.regional()) {
            kinds.push(GridKind::Site);
        }
        kinds
    }
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(RunMode::All),
            "reference" => Ok(RunMode::Reference),
            "regional" => Ok(RunMode::Regional),
            "site" => Ok(RunMode::Site),
            "noreference" => Ok(RunMode::NoReference),
            "none" => Ok(RunMode::None),
            other => Err(ConfigError::invalid("mode", format!("unknown run mode '{other}'"))),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::All => "all",
            RunMode::Reference => "reference",
            RunMode::Regional => "regional",
            RunMode::Site => "site",
            RunMode::NoReference => "noreference",
            RunMode::None => "none",
        };
        f.write_str(name)
    }
}

/// Grids, correspondence and schedules of one study, derived and checked
/// before any simulator runs.
#[derive(Debug)]
pub struct Study<'a> {
    config: &'a ExpreccsConfig,
    layout: RunLayout,
    grids: NestedGrids,
    classes: Vec<NodeClass>,
    corners: SiteCorners,
    faces: SideBoundaries<BoundaryFaceSet>,
    regional_schedule: Schedule,
    site_schedule: Schedule,
}

impl<'a> Study<'a> {
    /// Derive everything the runs need. Geometry and configuration problems,
    /// including missing `templates`, surface here.
    pub fn new(
        config: &'a ExpreccsConfig,
        root: impl Into<PathBuf>,
        templates: &[GridKind],
    ) -> Result<Self> {
        for kind in templates {
            template_path(config, *kind)?;
        }
        let grids = config.nested_grids()?;
        let classes = classify_regional_cells(&grids.regional, &grids.footprint);
        let corners = find_site_corners(&classes, grids.regional.dims())?;
        corners.require_interior(grids.regional.dims())?;
        let faces = conforming_face_sets(&grids.site, &grids.regional, &corners, &grids.ratio)?;
        if config.boundary.has_face_values() {
            BoundaryProjection::new(
                config.boundary,
                &grids.regional,
                &grids.site,
                corners,
                grids.ratio,
                &faces,
            )?;
        }
        let regional_schedule = config.schedule.regional()?;
        let site_schedule = config.schedule.site()?;
        for (n, well) in config.wells.iter().enumerate() {
            for grid in [&grids.reference, &grids.regional, &grids.site] {
                match grid.locate(*well) {
                    Some(ijk) => tracing::debug!(well = n, grid = %grid.kind(), ?ijk, "located well"),
                    None => tracing::debug!(well = n, grid = %grid.kind(), "well outside grid"),
                }
            }
        }
        tracing::info!(
            reference = ?grids.reference.dims(),
            regional = ?grids.regional.dims(),
            site = ?grids.site.dims(),
            corners = ?(corners.min, corners.max),
            regional_steps = regional_schedule.n_steps(),
            site_steps = site_schedule.n_steps(),
            "study prepared"
        );
        Ok(Self {
            config,
            layout: RunLayout::new(root),
            grids,
            classes,
            corners,
            faces,
            regional_schedule,
            site_schedule,
        })
    }

    /// Folder layout.
    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// The derived grids.
    pub fn grids(&self) -> &NestedGrids {
        &self.grids
    }

    /// Regional cells under the site.
    pub fn corners(&self) -> SiteCorners {
        self.corners
    }

    /// Inputs of the multiplier computation.
    pub fn coupling_geometry(&self) -> CouplingGeometry {
        CouplingGeometry {
            regional_dims: self.grids.regional.dims(),
            corners: self.corners,
            ratio: self.grids.ratio,
        }
    }

    /// Name of the site run for the configured boundary kind.
    pub fn site_run(&self) -> String {
        format!("site_{}", self.config.boundary)
    }

    fn template(&self, kind: GridKind) -> Result<DeckRewriter> {
        Ok(DeckRewriter::from_file(template_path(self.config, kind)?)?)
    }

    fn start_deck(&self, name: &str, grid: &Grid) -> Result<(PathBuf, DeckRewriter)> {
        self.layout.create(name)?;
        let dir = self.layout.preprocessing(name);
        let mut deck = self.template(grid.kind())?;
        let [nx, ny, nz] = grid.dims();
        deck.set_record("DIMENS", &format!("{nx} {ny} {nz}"));
        let files = write_geometry(&dir, grid)?;
        let files: Vec<&str> = files.iter().map(String::as_str).collect();
        deck.include_after("GRID", &files);
        Ok((dir, deck))
    }

    fn finish_deck(&self, name: &str, deck: &DeckRewriter) -> Result<RunRequest> {
        let request = self.layout.request(name);
        deck.write(&request.deck)?;
        tracing::info!(run = name, deck = %request.deck.display(), "deck written");
        Ok(request)
    }

    /// Write the reference deck.
    pub fn prepare_reference(&self, name: &str) -> Result<RunRequest> {
        let grid = &self.grids.reference;
        let (dir, mut deck) = self.start_deck(name, grid)?;
        let fipnum = inside_mask(&classify_regional_cells(grid, &self.grids.footprint));
        write_int_include(&dir.join("FIPNUM_REFERENCE.INC"), "FIPNUM", &fipnum)?;
        deck.include_after("REGIONS", &["FIPNUM_REFERENCE.INC"]);
        deck.set_tsteps(&self.site_schedule)?;
        self.finish_deck(name, &deck)
    }

    /// Boundary conditions of the site model from a regional run, written
    /// into `dir`. Returns the include files the deck needs after `GRID`.
    fn write_site_boundary<A>(&self, dir: &Path, regional: &A) -> Result<Vec<&'static str>>
    where
        A: SimulationArchive + ?Sized,
    {
        let kind = self.config.boundary;
        match kind {
            BoundaryKind::Flux | BoundaryKind::Pres | BoundaryKind::Pres2p => {
                let projection = BoundaryProjection::new(
                    kind,
                    &self.grids.regional,
                    &self.grids.site,
                    self.corners,
                    self.grids.ratio,
                    &self.faces,
                )?;
                let keywords = self.config.phase.keywords();
                let mut series = Vec::with_capacity(regional.n_steps());
                for step in 0..regional.n_steps() {
                    let pressure = if kind.is_pressure() {
                        regional.restart_global("PRESSURE", step)?
                    } else {
                        Vec::new()
                    };
                    let (flux_i, flux_j) = if kind == BoundaryKind::Flux {
                        (
                            regional.restart_global(keywords.flux(FaceDirection::XPlus), step)?,
                            regional.restart_global(keywords.flux(FaceDirection::YPlus), step)?,
                        )
                    } else {
                        (Vec::new(), Vec::new())
                    };
                    series.push(projection.project_step(&RegionalState {
                        pressure: &pressure,
                        flux_i: &flux_i,
                        flux_j: &flux_j,
                    })?);
                }
                let (source, values) = report_series(regional.report_times(), series)?;
                let resampled = resample(
                    &source,
                    &values,
                    &self.site_schedule,
                    self.config.schedule.time_interp,
                );
                let ids: Vec<_> = self.faces.iter().flat_map(|(_, s)| s.faces.iter().map(|f| f.id)).collect();
                let bc_kind = if kind == BoundaryKind::Flux {
                    BcpropKind::Rate
                } else {
                    BcpropKind::Dirichlet
                };
                for (n, values) in resampled.iter().enumerate().skip(1) {
                    let path = dir.join("bc").join(format!("BCPROP{n}.INC"));
                    write_bcprop_file(&path, bc_kind, keywords.component(), &ids, values)?;
                }
                let rows: Vec<BcconRow> = self
                    .faces
                    .iter()
                    .flat_map(|(side, s)| {
                        s.faces.iter().map(move |f| BcconRow {
                            id: f.id,
                            cell: f.site_cell,
                            side,
                        })
                    })
                    .collect();
                write_bccon_file(&dir.join("BCCON.INC"), &rows)?;
                tracing::info!(%kind, faces = ids.len(), steps = resampled.len().saturating_sub(1), "site boundary written");
                Ok(vec!["BCCON.INC"])
            }
            BoundaryKind::Porvproj => {
                let porv = regional.init_global("PORV")?;
                let side = porv_projections(&self.classes, &porv);
                let inner = inner_side_porv(&self.grids.regional, &self.corners, &self.grids.ratio, &porv);
                let mult = site_porv_multipliers(self.grids.site.dims(), &side, &inner);
                write_real_include(&dir.join("MULTPV_SITE.INC"), "MULTPV", &mult)?;
                tracing::info!(%kind, "site pore-volume multipliers written");
                Ok(vec!["MULTPV_SITE.INC"])
            }
            BoundaryKind::Wells => Ok(Vec::new()),
        }
    }
}

/// `DX`, `DY`, `DZ` and `TOPS` include files of a grid; returns their names.
fn write_geometry(dir: &Path, grid: &Grid) -> Result<Vec<String>> {
    let [nx, ny, nz] = grid.dims();
    let n = grid.n_cells();
    let mut arrays: [Vec<f64>; 4] = std::array::from_fn(|_| Vec::with_capacity(n));
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let size = grid.cell_size(i, j, k);
                let center = grid.cell_center(i, j, k);
                arrays[0].push(size[0]);
                arrays[1].push(size[1]);
                arrays[2].push(size[2]);
                arrays[3].push(center[2] - 0.5 * size[2]);
            }
        }
    }
    let mut names = Vec::with_capacity(4);
    for (keyword, values) in ["DX", "DY", "DZ", "TOPS"].into_iter().zip(&arrays) {
        let file = format!("{keyword}.INC");
        write_real_include(&dir.join(&file), keyword, values)?;
        names.push(file);
    }
    Ok(names)
}

impl CouplingModels for Study<'_> {
    type Archive = EclArchive;

    fn write_multipliers(&self, name: &str, field: &MultiplierField) -> Result<()> {
        self.layout.create(name)?;
        field.write_includes(&self.layout.preprocessing(name))?;
        Ok(())
    }

    fn prepare_regional(&self, name: &str) -> Result<RunRequest> {
        let grid = &self.grids.regional;
        let (dir, mut deck) = self.start_deck(name, grid)?;
        let multipliers: Vec<String> = FaceDirection::ALL
            .iter()
            .map(|d| MultiplierField::file_name(*d))
            .collect();
        let multipliers: Vec<&str> = multipliers.iter().map(String::as_str).collect();
        deck.include_after("GRID", &multipliers);
        write_int_include(&dir.join("FIPNUM_REGIONAL.INC"), "FIPNUM", &inside_mask(&self.classes))?;
        deck.include_after("REGIONS", &["FIPNUM_REGIONAL.INC"]);
        deck.set_tsteps(&self.regional_schedule)?;
        self.finish_deck(name, &deck)
    }

    fn prepare_site(&self, name: &str, regional: &EclArchive) -> Result<RunRequest> {
        let grid = &self.grids.site;
        let (dir, mut deck) = self.start_deck(name, grid)?;
        let includes = self.write_site_boundary(&dir, regional)?;
        deck.include_after("GRID", &includes);
        deck.set_tsteps(&self.site_schedule)?;
        if self.config.boundary.has_face_values() {
            deck.replace_tsteps(&self.site_schedule, "bc")?;
        }
        self.finish_deck(name, &deck)
    }

    fn open(&self, name: &str) -> Result<EclArchive> {
        Ok(EclArchive::open(
            self.layout.case(name),
            self.config.simulator.restart_layout,
        )?)
    }
}

fn template_path(config: &ExpreccsConfig, kind: GridKind) -> Result<&Path> {
    let decks = &config.decks;
    let path = match kind {
        GridKind::Reference => decks.reference.as_deref(),
        GridKind::Regional => decks.regional.as_deref(),
        GridKind::Site => decks.site.as_deref(),
    };
    let key = format!("decks.{}", kind.name());
    let path = path.ok_or_else(|| ConfigError::Missing(key.clone()))?;
    if !path.is_file() {
        return Err(ConfigError::invalid(&key, format!("no template deck at {}", path.display())).into());
    }
    Ok(path)
}

/// Run the models selected by `mode` once, without back-coupling.
///
/// Reference and regional run concurrently; the site runs after the regional
/// output exists. With [`RunMode::None`] only the reference and regional
/// decks are written.
pub fn run_models<S>(config: &ExpreccsConfig, root: &Path, mode: RunMode, simulator: &S) -> Result<()>
where
    S: Simulator + ?Sized,
{
    let study = Study::new(config, root, &mode.templates(false))?;
    tracing::info!(%mode, root = %root.display(), "running models");
    let mut batch = Vec::new();
    if mode.regional() || mode == RunMode::None {
        study.write_multipliers("regional", &MultiplierField::ones(study.grids().regional.dims()))?;
    }
    if mode.reference() || mode == RunMode::None {
        batch.push(study.prepare_reference("reference")?);
    }
    if mode.regional() || mode == RunMode::None {
        batch.push(study.prepare_regional("regional")?);
    }
    if mode == RunMode::None {
        return Ok(());
    }
    run_batch(simulator, &batch)?;
    if mode.site() {
        let regional = study.open("regional")?;
        let request = study.prepare_site(&study.site_run(), &regional)?;
        simulator.run(&request)?;
    }
    Ok(())
}

/// Back-coupled regional and site runs, after an optional reference run.
///
/// With zero iterations this is [`run_models`] with the same mode and the
/// returned multipliers are all one. Otherwise returns the final multipliers.
pub fn backcoupling<S>(config: &ExpreccsConfig, root: &Path, mode: RunMode, simulator: &S) -> Result<MultiplierField>
where
    S: Simulator + ?Sized,
{
    if config.iterations == 0 {
        run_models(config, root, mode, simulator)?;
        return Ok(MultiplierField::ones(config.nested_grids()?.regional.dims()));
    }
    let study = Study::new(config, root, &mode.templates(true))?;
    if mode.reference() || mode == RunMode::None {
        let request = study.prepare_reference("reference")?;
        if mode != RunMode::None {
            simulator.run(&request)?;
        }
    }
    if !mode.regional() {
        tracing::info!(%mode, "back-coupling skipped for this mode");
        return Ok(MultiplierField::ones(study.grids().regional.dims()));
    }
    let field = BackCoupling::new(
        &study,
        simulator,
        study.coupling_geometry(),
        config.phase,
        config.boundary,
        config.iterations,
    )
    .run()?;
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::simulation::{RunReport, SimulatorError};
    use std::sync::Mutex;

    const TEMPLATE: &str = "RUNSPEC\nDIMENS\n1 1 1 /\nGRID\nINIT\nEDIT\nREGIONS\nSCHEDULE\nTSTEP\n1 /\nEND\n";

    fn config(dir: &Path, kind: &str, iterations: usize) -> ExpreccsConfig {
        for name in ["REFERENCE", "REGIONAL", "SITE"] {
            std::fs::write(dir.join(format!("{name}.DATA")), TEMPLATE).unwrap();
        }
        let text = format!(
            r#"
[grid]
regional_dims = [1000.0, 1000.0, 20.0]
regional_cells = [10, 10, 2]
site_location = [300.0, 300.0, 0.0, 700.0, 700.0, 20.0]
site_cells = [8, 8, 2]

[schedule]
injection = [[10.0, 5.0, 1.0]]

[boundary]
kind = "{kind}"

[coupling]
iterations = {iterations}

[decks]
reference = "{0}/REFERENCE.DATA"
regional = "{0}/REGIONAL.DATA"
site = "{0}/SITE.DATA"
"#,
            dir.display()
        );
        ExpreccsConfig::from_str(&text).unwrap()
    }

    struct Recorder(Mutex<Vec<String>>);

    impl Simulator for Recorder {
        fn run(&self, request: &RunRequest) -> std::result::Result<RunReport, SimulatorError> {
            self.0.lock().unwrap().push(request.name.clone());
            Ok(RunReport {
                name: request.name.clone(),
                wall_time: 0.0,
            })
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("noreference".parse::<RunMode>().unwrap(), RunMode::NoReference);
        assert_eq!("ALL".parse::<RunMode>().unwrap(), RunMode::All);
        assert!("sometimes".parse::<RunMode>().is_err());
        assert_eq!(RunMode::Site.to_string(), "site");
    }

    #[test]
    fn test_study_geometry() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path(), "pres", 0);
        let study = Study::new(&config, tmp.path().join("study"), &[]).unwrap();
        assert_eq!(study.corners().min, [3, 3, 0]);
        assert_eq!(study.corners().max, [6, 6, 1]);
        assert_eq!(study.grids().ratio.x, 2);
        assert_eq!(study.site_run(), "site_pres");
    }

    #[test]
    fn test_decks_only() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path(), "pres", 0);
        let root = tmp.path().join("study");
        let sim = Recorder(Mutex::new(Vec::new()));
        run_models(&config, &root, RunMode::None, &sim).unwrap();
        assert!(sim.0.lock().unwrap().is_empty());

        let layout = RunLayout::new(&root);
        let regional = std::fs::read_to_string(layout.deck("regional")).unwrap();
        assert!(regional.contains("DIMENS\n10 10 2 /"));
        assert!(regional.contains("'FIPNUM_REGIONAL.INC' /"));
        assert!(regional.contains("'MULTX_REGIONAL.INC' /"));
        assert!(regional.contains("TSTEP\n5\n5\n/"));
        let fipnum = std::fs::read_to_string(layout.preprocessing("regional").join("FIPNUM_REGIONAL.INC")).unwrap();
        assert_eq!(fipnum.lines().filter(|l| *l == "1").count(), 32);
        let reference = std::fs::read_to_string(layout.deck("reference")).unwrap();
        assert!(reference.contains("DIMENS\n20 20 2 /"));
        assert!(layout.preprocessing("reference").join("TOPS.INC").is_file());
    }

    #[test]
    fn test_missing_template() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config(tmp.path(), "pres", 0);
        config.decks.reference = None;
        let sim = Recorder(Mutex::new(Vec::new()));
        let err = run_models(&config, &tmp.path().join("study"), RunMode::Reference, &sim).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
        assert!(matches!(err, Error::Config(ConfigError::Missing(_))));
    }

    #[test]
    fn test_missing_site_template_fails_before_any_run() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config(tmp.path(), "pres", 2);
        config.decks.site = None;
        let root = tmp.path().join("study");
        let err = Study::new(&config, &root, &RunMode::All.templates(false)).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Missing(ref key)) if key == "decks.site"));

        // Regional-only back-coupling still needs the site template.
        let sim = Recorder(Mutex::new(Vec::new()));
        assert!(backcoupling(&config, &root, RunMode::Regional, &sim).is_err());
        assert!(sim.0.lock().unwrap().is_empty());
        assert!(!root.join("regional").exists());

        // A configured path that does not exist is rejected too.
        config.decks.site = Some(tmp.path().join("MISSING.DATA"));
        let err = Study::new(&config, &root, &[GridKind::Site]).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Invalid { .. })));
        // Regional-only single runs do not need it.
        assert!(Study::new(&config, &root, &RunMode::Regional.templates(false)).is_ok());
    }
}
