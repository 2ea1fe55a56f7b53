//! Running the external simulator.
//!
//! - [`Simulator`]: blocking run of one deck
//! - [`FlowSimulator`]: subprocess implementation
//! - [`run_batch`]: independent runs launched together, joined at a barrier
//! - [`RunLayout`]: `preprocessing/<name>` and `output/<name>` folders
//!
//! # Example
//! ```no_run
//! use expreccs::simulation::{FlowSimulator, RunLayout, Simulator, run_batch};
//!
//! let layout = RunLayout::new("study");
//! let flow = FlowSimulator::new("flow");
//! run_batch(&flow, &[layout.request("reference"), layout.request("regional")]).unwrap();
//! flow.run(&layout.request("site_pres")).unwrap();
//! ```

mod layout;
mod runner;

pub use layout::RunLayout;
pub use runner::{FlowSimulator, RunReport, RunRequest, Simulator, SimulatorError, run_batch};
