//! Iterative correction of the regional model from site fluxes.
//!
//! Each iteration `n` (one-based) runs `regional_n` with the current
//! multipliers, projects its output onto the site boundary, runs
//! `site_<kind>_n`, and turns the flux mismatch into the multipliers of the
//! next regional run. The loop always performs the configured number of
//! iterations; there is no convergence test.

use std::fmt;

use super::multipliers::{CouplingGeometry, FluxTotals, MultiplierField, compute_multipliers};
use crate::error::Result;
use crate::io::SimulationArchive;
use crate::projection::BoundaryKind;
use crate::simulation::{RunRequest, Simulator};
use crate::types::{LiquidPhase, PhaseKeywords};

/// Where the loop stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CouplingState {
    /// Nothing done yet.
    Init,
    /// Next: run regional model `iteration`.
    RunRegional {
        /// One-based iteration.
        iteration: usize,
    },
    /// Next: build the site boundary conditions from the regional output.
    ProjectBoundary {
        /// One-based iteration.
        iteration: usize,
    },
    /// Next: run the site model.
    RunSite {
        /// One-based iteration.
        iteration: usize,
    },
    /// Next: compare site and regional fluxes.
    ComputeMultipliers {
        /// One-based iteration.
        iteration: usize,
    },
    /// Next: persist the multipliers for the following regional run.
    WriteRegionalMultipliers {
        /// One-based iteration.
        iteration: usize,
    },
    /// Finished.
    Done,
}

impl fmt::Display for CouplingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouplingState::Init => write!(f, "init"),
            CouplingState::RunRegional { iteration } => write!(f, "run regional ({iteration})"),
            CouplingState::ProjectBoundary { iteration } => write!(f, "project boundary ({iteration})"),
            CouplingState::RunSite { iteration } => write!(f, "run site ({iteration})"),
            CouplingState::ComputeMultipliers { iteration } => {
                write!(f, "compute multipliers ({iteration})")
            }
            CouplingState::WriteRegionalMultipliers { iteration } => {
                write!(f, "write multipliers ({iteration})")
            }
            CouplingState::Done => write!(f, "done"),
        }
    }
}

/// Deck preparation and output access for the loop.
///
/// Run names follow `regional_{n}` and `site_{kind}_{n}` so that every
/// iteration writes to its own folders.
pub trait CouplingModels {
    /// Archive type the runs produce.
    type Archive: SimulationArchive;

    /// Store multipliers where the deck of regional run `name` includes them.
    fn write_multipliers(&self, name: &str, field: &MultiplierField) -> Result<()>;

    /// Write the deck of regional run `name`.
    fn prepare_regional(&self, name: &str) -> Result<RunRequest>;

    /// Write the deck of site run `name` with boundary conditions projected
    /// from `regional`.
    fn prepare_site(&self, name: &str, regional: &Self::Archive) -> Result<RunRequest>;

    /// Open the output of a finished run.
    fn open(&self, name: &str) -> Result<Self::Archive>;
}

/// Name of regional run `n`.
pub fn regional_name(iteration: usize) -> String {
    format!("regional_{iteration}")
}

/// Name of site run `n`.
pub fn site_name(kind: BoundaryKind, iteration: usize) -> String {
    format!("site_{kind}_{iteration}")
}

/// The back-coupling state machine.
pub struct BackCoupling<'a, M, S>
where
    M: CouplingModels,
    S: Simulator + ?Sized,
{
    models: &'a M,
    simulator: &'a S,
    geometry: CouplingGeometry,
    keywords: PhaseKeywords,
    kind: BoundaryKind,
    iterations: usize,
    state: CouplingState,
    multipliers: MultiplierField,
    regional: Option<M::Archive>,
    site_request: Option<RunRequest>,
}

impl<'a, M, S> BackCoupling<'a, M, S>
where
    M: CouplingModels,
    S: Simulator + ?Sized,
{
    /// Loop of `iterations` rounds, starting from unit multipliers.
    pub fn new(
        models: &'a M,
        simulator: &'a S,
        geometry: CouplingGeometry,
        phase: LiquidPhase,
        kind: BoundaryKind,
        iterations: usize,
    ) -> Self {
        Self {
            models,
            simulator,
            geometry,
            keywords: phase.keywords(),
            kind,
            iterations,
            state: CouplingState::Init,
            multipliers: MultiplierField::ones(geometry.regional_dims),
            regional: None,
            site_request: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> CouplingState {
        self.state
    }

    /// Latest multipliers.
    pub fn multipliers(&self) -> &MultiplierField {
        &self.multipliers
    }

    /// Perform the current state's action and move on. Returns the new state.
    pub fn step(&mut self) -> Result<CouplingState> {
        let next = match self.state {
            CouplingState::Init if self.iterations == 0 => CouplingState::Done,
            CouplingState::Init => {
                self.models.write_multipliers(&regional_name(1), &self.multipliers)?;
                CouplingState::RunRegional { iteration: 1 }
            }
            CouplingState::RunRegional { iteration } => {
                let request = self.models.prepare_regional(&regional_name(iteration))?;
                self.simulator.run(&request)?;
                CouplingState::ProjectBoundary { iteration }
            }
            CouplingState::ProjectBoundary { iteration } => {
                let regional = self.models.open(&regional_name(iteration))?;
                let name = site_name(self.kind, iteration);
                self.site_request = Some(self.models.prepare_site(&name, &regional)?);
                self.regional = Some(regional);
                CouplingState::RunSite { iteration }
            }
            CouplingState::RunSite { iteration } => {
                let request = match self.site_request.take() {
                    Some(r) => r,
                    None => {
                        let regional = self.models.open(&regional_name(iteration))?;
                        self.models.prepare_site(&site_name(self.kind, iteration), &regional)?
                    }
                };
                self.simulator.run(&request)?;
                CouplingState::ComputeMultipliers { iteration }
            }
            CouplingState::ComputeMultipliers { iteration } => {
                let regional = match self.regional.take() {
                    Some(a) => a,
                    None => self.models.open(&regional_name(iteration))?,
                };
                let site = self.models.open(&site_name(self.kind, iteration))?;
                let regional_totals = FluxTotals::from_archive(&regional, &self.keywords)?;
                let site_totals = FluxTotals::from_archive(&site, &self.keywords)?;
                self.multipliers = compute_multipliers(&regional_totals, &site_totals, &self.geometry)?;
                CouplingState::WriteRegionalMultipliers { iteration }
            }
            CouplingState::WriteRegionalMultipliers { iteration } => {
                self.models
                    .write_multipliers(&regional_name(iteration + 1), &self.multipliers)?;
                if iteration < self.iterations {
                    CouplingState::RunRegional {
                        iteration: iteration + 1,
                    }
                } else {
                    CouplingState::Done
                }
            }
            CouplingState::Done => CouplingState::Done,
        };
        tracing::info!(from = %self.state, to = %next, "back-coupling");
        self.state = next;
        Ok(next)
    }

    /// Run to completion and return the final multipliers.
    pub fn run(mut self) -> Result<MultiplierField> {
        while self.step()? != CouplingState::Done {}
        Ok(self.multipliers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::SiteCorners;
    use crate::grid::{AxisPartition, CornerPointGrid, GridKind, RefinementRatio, build_grid};
    use crate::io::MemoryArchive;
    use crate::simulation::{RunReport, SimulatorError};
    use crate::types::FaceDirection;
    use std::cell::RefCell;
    use std::sync::Mutex;

    fn grid(n: usize) -> CornerPointGrid {
        let g = build_grid(
            GridKind::Regional,
            [0.0; 3],
            [n as f64, n as f64, 1.0],
            &[
                AxisPartition::Uniform(n),
                AxisPartition::Uniform(n),
                AxisPartition::Uniform(1),
            ],
        )
        .unwrap();
        CornerPointGrid::from_structured(&g)
    }

    fn archive(n: usize, flux: f64) -> MemoryArchive {
        let keywords = LiquidPhase::Water.keywords();
        let cells = n * n;
        let mut a = MemoryArchive::new(grid(n));
        for t in [0.0, 86_400.0] {
            a.push_step(
                t,
                FaceDirection::ALL.map(|d| (keywords.flux(d), vec![flux; cells])),
            );
        }
        a
    }

    #[derive(Default)]
    struct Models {
        log: RefCell<Vec<String>>,
    }

    impl CouplingModels for Models {
        type Archive = MemoryArchive;

        fn write_multipliers(&self, name: &str, field: &MultiplierField) -> Result<()> {
            self.log
                .borrow_mut()
                .push(format!("mult {name} {}", field.get(FaceDirection::XPlus)[6]));
            Ok(())
        }

        fn prepare_regional(&self, name: &str) -> Result<RunRequest> {
            self.log.borrow_mut().push(format!("deck {name}"));
            Ok(RunRequest {
                name: name.into(),
                deck: name.into(),
                output_dir: name.into(),
            })
        }

        fn prepare_site(&self, name: &str, regional: &MemoryArchive) -> Result<RunRequest> {
            self.log
                .borrow_mut()
                .push(format!("deck {name} from {}", regional.n_steps()));
            Ok(RunRequest {
                name: name.into(),
                deck: name.into(),
                output_dir: name.into(),
            })
        }

        fn open(&self, name: &str) -> Result<MemoryArchive> {
            Ok(if name.starts_with("regional") {
                archive(5, 2.0)
            } else {
                archive(3, 3.0)
            })
        }
    }

    struct Runs(Mutex<Vec<String>>, Option<&'static str>);

    impl Simulator for Runs {
        fn run(&self, request: &RunRequest) -> std::result::Result<RunReport, SimulatorError> {
            self.0.lock().unwrap().push(request.name.clone());
            if self.1 == Some(request.name.as_str()) {
                return Err(SimulatorError::NonZeroExit {
                    program: "mock".into(),
                    name: request.name.clone(),
                    code: Some(3),
                });
            }
            Ok(RunReport {
                name: request.name.clone(),
                wall_time: 0.0,
            })
        }
    }

    fn geometry() -> CouplingGeometry {
        CouplingGeometry {
            regional_dims: [5, 5, 1],
            corners: SiteCorners {
                min: [1, 1, 0],
                max: [3, 3, 0],
            },
            ratio: RefinementRatio::ONE,
        }
    }

    #[test]
    fn test_two_iterations() {
        let models = Models::default();
        let sim = Runs(Mutex::new(Vec::new()), None);
        let field = BackCoupling::new(&models, &sim, geometry(), LiquidPhase::Water, BoundaryKind::Pres, 2)
            .run()
            .unwrap();
        assert_eq!(
            *sim.0.lock().unwrap(),
            vec!["regional_1", "site_pres_1", "regional_2", "site_pres_2"]
        );
        // Two steps of 3.0 over two steps of 2.0.
        assert!((field.get(FaceDirection::XPlus)[6] - 1.5).abs() < 1e-12);
        let log = models.log.borrow();
        assert_eq!(log[0], "mult regional_1 1");
        assert_eq!(log[1], "deck regional_1");
        assert_eq!(log[2], "deck site_pres_1 from 2");
        assert_eq!(log[3], "mult regional_2 1.5");
        assert_eq!(log.last().map(String::as_str), Some("mult regional_3 1.5"));
    }

    #[test]
    fn test_state_sequence() {
        let models = Models::default();
        let sim = Runs(Mutex::new(Vec::new()), None);
        let mut loop_ = BackCoupling::new(&models, &sim, geometry(), LiquidPhase::Water, BoundaryKind::Flux, 1);
        let mut states = vec![loop_.state()];
        while loop_.state() != CouplingState::Done {
            states.push(loop_.step().unwrap());
        }
        assert_eq!(
            states,
            vec![
                CouplingState::Init,
                CouplingState::RunRegional { iteration: 1 },
                CouplingState::ProjectBoundary { iteration: 1 },
                CouplingState::RunSite { iteration: 1 },
                CouplingState::ComputeMultipliers { iteration: 1 },
                CouplingState::WriteRegionalMultipliers { iteration: 1 },
                CouplingState::Done,
            ]
        );
    }

    #[test]
    fn test_zero_iterations() {
        let models = Models::default();
        let sim = Runs(Mutex::new(Vec::new()), None);
        let field = BackCoupling::new(&models, &sim, geometry(), LiquidPhase::Water, BoundaryKind::Pres, 0)
            .run()
            .unwrap();
        assert!(field.is_identity());
        assert!(sim.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_simulator_failure_aborts() {
        let models = Models::default();
        let sim = Runs(Mutex::new(Vec::new()), Some("site_pres_1"));
        let err = BackCoupling::new(&models, &sim, geometry(), LiquidPhase::Water, BoundaryKind::Pres, 3)
            .run()
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ExternalTool);
        assert_eq!(sim.0.lock().unwrap().len(), 2);
    }
}
