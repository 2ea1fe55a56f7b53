//! Integration tests for the study driver.
//!
//! A fake simulator writes ECL binary output for every deck it is given, so
//! these tests cover:
//! - Deck generation for all three models
//! - Pressure boundary conditions of the site model
//! - The back-coupling run order and multiplier files

use std::path::Path;
use std::sync::Mutex;

use expreccs::config::ExpreccsConfig;
use expreccs::coupling::MultiplierField;
use expreccs::grid::{CornerPointGrid, Grid};
use expreccs::io::{EclRecord, EclValues, RestartLayout, write_case};
use expreccs::simulation::{RunLayout, RunReport, RunRequest, Simulator, SimulatorError};
use expreccs::types::{FaceDirection, LiquidPhase};
use expreccs::workflow::{RunMode, backcoupling, run_models};

const TOL: f64 = 1e-6;
const DAY: f64 = 86_400.0;

const TEMPLATE: &str = "RUNSPEC\nDIMENS\n1 1 1 /\nGRID\nINIT\nREGIONS\nSOLUTION\nSCHEDULE\nTSTEP\n1 /\nEND\n";

fn write_config(dir: &Path, kind: &str, iterations: usize) -> ExpreccsConfig {
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
    let path = dir.join("study.toml");
    std::fs::write(&path, text).unwrap();
    ExpreccsConfig::from_file(&path).unwrap()
}

/// Writes a finished case for each request: pressure rising with `x` and a
/// uniform flux per model, split evenly over the report steps.
struct FakeFlow {
    reference: Grid,
    regional: Grid,
    site: Grid,
    runs: Mutex<Vec<String>>,
}

impl FakeFlow {
    fn new(config: &ExpreccsConfig) -> Self {
        let grids = config.nested_grids().unwrap();
        Self {
            reference: grids.reference,
            regional: grids.regional,
            site: grids.site,
            runs: Mutex::new(Vec::new()),
        }
    }

    fn runs(&self) -> Vec<String> {
        self.runs.lock().unwrap().clone()
    }
}

impl Simulator for FakeFlow {
    fn run(&self, request: &RunRequest) -> Result<RunReport, SimulatorError> {
        self.runs.lock().unwrap().push(request.name.clone());
        let (grid, flux, times) = if request.name.starts_with("regional") {
            (&self.regional, 2.0, vec![5.0 * DAY, 10.0 * DAY])
        } else if request.name.starts_with("site") {
            (&self.site, 3.0, (1..=10).map(|d| d as f64 * DAY).collect())
        } else {
            (&self.reference, 1.0, vec![10.0 * DAY])
        };
        let n = grid.n_cells();
        let flux = flux / times.len() as f64;
        let pressure: Vec<f32> = (0..n)
            .map(|c| {
                let [i, j, k] = grid.ijk(expreccs::types::CellIndex::new(c));
                (100.0 + 0.01 * grid.cell_center(i, j, k)[0]) as f32
            })
            .collect();
        let keywords = LiquidPhase::Water.keywords();
        let steps: Vec<(f64, Vec<EclRecord>)> = times
            .iter()
            .map(|t| {
                let mut records = vec![EclRecord::new("PRESSURE", EclValues::Real(pressure.clone()))];
                for d in FaceDirection::ALL {
                    records.push(EclRecord::new(keywords.flux(d), EclValues::Real(vec![flux as f32; n])));
                }
                (*t, records)
            })
            .collect();
        let init = vec![EclRecord::new("PORV", EclValues::Real(vec![1000.0; n]))];
        let cp = CornerPointGrid::from_structured(grid);
        let case = request.output_dir.join(request.name.to_uppercase());
        write_case(&case, RestartLayout::Unified, &cp, &init, &steps).unwrap();
        Ok(RunReport {
            name: request.name.clone(),
            wall_time: 0.0,
        })
    }
}

#[test]
fn test_single_pass_pressure_boundary() {
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(tmp.path(), "pres", 0);
    let root = tmp.path().join("study");
    let sim = FakeFlow::new(&config);
    run_models(&config, &root, RunMode::All, &sim).unwrap();

    let runs = sim.runs();
    assert_eq!(runs.len(), 3);
    assert_eq!(runs.last().map(String::as_str), Some("site_pres"));

    let layout = RunLayout::new(&root);
    let site_dir = layout.preprocessing("site_pres");
    let deck = std::fs::read_to_string(layout.deck("site_pres")).unwrap();
    assert!(deck.contains("DIMENS\n8 8 2 /"));
    assert!(deck.contains("'BCCON.INC' /"));
    assert!(deck.contains("'bc/BCPROP1.INC' /"));
    assert!(deck.contains("'bc/BCPROP10.INC' /"));

    // 8 faces per side and layer.
    let bccon = std::fs::read_to_string(site_dir.join("BCCON.INC")).unwrap();
    assert_eq!(bccon.lines().filter(|l| l.trim_end().ends_with('/') && l.contains("J-")).count(), 16);

    // Pressure is linear in x and steady, so every face gets the value at its x.
    let bcprop = std::fs::read_to_string(site_dir.join("bc").join("BCPROP3.INC")).unwrap();
    let first: Vec<&str> = bcprop
        .lines()
        .find(|l| l.starts_with("1 "))
        .unwrap()
        .split_whitespace()
        .collect();
    assert_eq!(first[1], "DIRICHLET");
    assert_eq!(first[2], "WATER");
    let p: f64 = first[4].parse().unwrap();
    assert!((p - (100.0 + 0.01 * 325.0)).abs() < 1e-3, "pressure {p}");
}

#[test]
fn test_porvproj_site_deck() {
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(tmp.path(), "porvproj", 0);
    let root = tmp.path().join("study");
    let sim = FakeFlow::new(&config);
    run_models(&config, &root, RunMode::NoReference, &sim).unwrap();
    assert_eq!(sim.runs(), vec!["regional", "site_porvproj"]);

    let layout = RunLayout::new(&root);
    let mult = std::fs::read_to_string(layout.preprocessing("site_porvproj").join("MULTPV_SITE.INC")).unwrap();
    let values: Vec<f64> = mult
        .lines()
        .filter_map(|l| l.trim().parse().ok())
        .collect();
    assert_eq!(values.len(), 128);
    // Interior site cells keep their pore volume.
    assert!((values[3 + 3 * 8] - 1.0).abs() < TOL);
    assert!(values[3] > 1.0);
}

#[test]
fn test_backcoupling_iterations() {
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(tmp.path(), "flux", 2);
    let root = tmp.path().join("study");
    let sim = FakeFlow::new(&config);
    let field = backcoupling(&config, &root, RunMode::All, &sim).unwrap();

    assert_eq!(
        sim.runs(),
        vec!["reference", "regional_1", "site_flux_1", "regional_2", "site_flux_2"]
    );

    // Two fine faces of flux 3 against one coarse face of flux 2.
    let regional = config.nested_grids().unwrap().regional;
    let inside = regional.index(4, 4, 0).get();
    let outside = regional.index(0, 0, 0).get();
    assert!((field.get(FaceDirection::XPlus)[inside] - 3.0).abs() < 1e-4);
    assert!((field.get(FaceDirection::XPlus)[outside] - 1.0).abs() < TOL);

    let layout = RunLayout::new(&root);
    for name in ["regional_1", "regional_2", "regional_3"] {
        for d in FaceDirection::ALL {
            assert!(layout.preprocessing(name).join(MultiplierField::file_name(d)).is_file());
        }
    }
    let deck = std::fs::read_to_string(layout.deck("regional_2")).unwrap();
    assert!(deck.contains("'MULTX_REGIONAL.INC' /"));
    let site = std::fs::read_to_string(layout.preprocessing("site_flux_1").join("bc").join("BCPROP1.INC")).unwrap();
    assert!(site.contains("RATE WATER"));
}
