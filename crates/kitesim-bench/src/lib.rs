//! # kitesim-bench
//!
//! Scenario suite for the kitesim physics core.
//!
//! Provides 5 canonical tethered-kite scenarios, metric collection,
//! and CSV export for regression tracking.

pub mod metrics;
pub mod runner;
pub mod scenarios;

pub use metrics::ScenarioMetrics;
pub use runner::ScenarioRunner;
pub use scenarios::{Disturbance, Scenario, ScenarioKind};
