//! # kitesim-io
//!
//! Simulation input/output contract and input validation.
//!
//! Defines the boundary types that external systems (CLI, scripted runs,
//! tooling) use to configure the kitesim physics core and read its results.

pub mod contract;
pub mod driver;
pub mod validator;

pub use contract::{Gust, RunParams, SimulationInput, SimulationMetrics, SimulationOutput};
pub use driver::{run_simulation, RunOutcome};
pub use validator::validate_input;
