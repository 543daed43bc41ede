//! # kitesim-debug
//!
//! Observation-only tooling for the kite physics core:
//! - [`diagnostics`]: per-step constraint error, convergence, divergence
//!   detection, envelope checks and throttled summaries
//! - [`snapshot`]: binary state snapshots for replay and inspection

pub mod diagnostics;
pub mod snapshot;

pub use diagnostics::{
    ConstraintDiagnostics, ConstraintSample, ConvergenceReport, DiagnosticsConfig, StepObservation,
    SummaryThrottle,
};
pub use snapshot::KiteSnapshot;
