//! # kitesim-telemetry
//!
//! Event bus for simulation telemetry. The physics core emits structured
//! events (timing, convergence, rejected inputs, clamps, recoveries,
//! divergence) into a bus it is handed at construction; pluggable sinks
//! consume them (tracing, JSON lines, in-memory buffers for tests).

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{EventKind, Severity, SimulationEvent};
pub use sinks::{EventSink, JsonLinesSink, TracingSink, VecSink};
