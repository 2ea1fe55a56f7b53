//! External simulator invocation.
//!
//! The simulator is a black box that turns a deck into binary output files.
//! [`FlowSimulator`] launches it as a subprocess and waits for it; tests and
//! dry runs substitute their own [`Simulator`].

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

use thiserror::Error;

use crate::config::SimulatorConfig;

/// Error type for simulator runs.
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// The program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The program ran and failed.
    #[error("{program} failed on {name} with exit code {}", .code.map_or("none (signal)".to_string(), |c| c.to_string()))]
    NonZeroExit {
        /// Program name.
        program: String,
        /// Run name.
        name: String,
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
    },

    /// Output folder could not be prepared.
    #[error("cannot prepare {}: {source}", .path.display())]
    Io {
        /// Folder involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A run thread panicked.
    #[error("run {name} panicked")]
    Panicked {
        /// Run name.
        name: String,
    },
}

/// One simulator invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunRequest {
    /// Run name, e.g. `regional_2`.
    pub name: String,
    /// Input deck.
    pub deck: PathBuf,
    /// Folder receiving the output files.
    pub output_dir: PathBuf,
}

/// Outcome of a successful run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// Run name.
    pub name: String,
    /// Wall-clock seconds.
    pub wall_time: f64,
}

/// Something that runs decks to completion.
pub trait Simulator: Sync {
    /// Run one deck and block until it finishes.
    fn run(&self, request: &RunRequest) -> Result<RunReport, SimulatorError>;
}

/// Subprocess simulator: `<executable> <args...> --output-dir=<dir> <deck>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowSimulator {
    executable: String,
    args: Vec<String>,
    quiet: bool,
}

impl FlowSimulator {
    /// Simulator with no extra flags.
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            quiet: false,
        }
    }

    /// From the `[simulator]` table.
    pub fn from_config(config: &SimulatorConfig) -> Self {
        Self::new(config.executable.clone()).with_args(config.args.iter().cloned())
    }

    /// Append extra flags.
    pub fn with_args<I: IntoIterator<Item = String>>(mut self, args: I) -> Self {
        self.args.extend(args);
        self
    }

    /// Discard the simulator's stdout.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Command line for a request, without spawning it.
    pub fn command(&self, request: &RunRequest) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.args)
            .arg(format!("--output-dir={}", request.output_dir.display()))
            .arg(&request.deck);
        if self.quiet {
            cmd.stdout(Stdio::null());
        }
        cmd
    }
}

impl Simulator for FlowSimulator {
    fn run(&self, request: &RunRequest) -> Result<RunReport, SimulatorError> {
        std::fs::create_dir_all(&request.output_dir).map_err(|source| SimulatorError::Io {
            path: request.output_dir.clone(),
            source,
        })?;
        tracing::info!(
            name = %request.name,
            deck = %request.deck.display(),
            program = %self.executable,
            "launching simulator"
        );
        let start = Instant::now();
        let status = self
            .command(request)
            .status()
            .map_err(|source| SimulatorError::Spawn {
                program: self.executable.clone(),
                source,
            })?;
        if !status.success() {
            return Err(SimulatorError::NonZeroExit {
                program: self.executable.clone(),
                name: request.name.clone(),
                code: status.code(),
            });
        }
        let wall_time = start.elapsed().as_secs_f64();
        tracing::info!(name = %request.name, wall_time, "simulator finished");
        Ok(RunReport {
            name: request.name.clone(),
            wall_time,
        })
    }
}

/// Run independent decks concurrently and wait for all of them.
///
/// Every run is joined before returning; the first failure (in request order)
/// is reported.
pub fn run_batch<S>(simulator: &S, requests: &[RunRequest]) -> Result<Vec<RunReport>, SimulatorError>
where
    S: Simulator + ?Sized,
{
    if let [single] = requests {
        return simulator.run(single).map(|r| vec![r]);
    }
    let results: Vec<Result<RunReport, SimulatorError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .map(|request| (request, scope.spawn(move || simulator.run(request))))
            .collect();
        handles
            .into_iter()
            .map(|(request, handle)| {
                handle.join().unwrap_or_else(|_| {
                    Err(SimulatorError::Panicked {
                        name: request.name.clone(),
                    })
                })
            })
            .collect()
    });
    results.into_iter().collect()
}
