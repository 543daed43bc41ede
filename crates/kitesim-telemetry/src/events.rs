//! Simulation event types.
//!
//! Structured events emitted by the physics core at various points in each
//! timestep. Events are lightweight value types that carry just enough data
//! to be useful for monitoring and debugging.

use serde::{Deserialize, Serialize};

/// A simulation event emitted by the core.
///
/// Events are tagged with a timestep index and carry domain-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    /// Timestep number (0-indexed, reset with the simulation).
    pub timestep: u32,
    /// Event payload.
    pub kind: EventKind,
}

/// How loudly an event should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Debug,
    Info,
    Warning,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Timestep started.
    TimestepBegin {
        /// Simulated time at the start of the step (seconds).
        sim_time: f64,
        /// Integrated timestep after clamping (seconds).
        dt: f32,
    },

    /// Timestep completed.
    TimestepEnd {
        /// Wall-clock time for the entire timestep (seconds).
        wall_time: f64,
    },

    /// Constraint projection pass completed.
    SolverIteration {
        /// Iteration number within the timestep.
        iteration: u32,
        /// Largest constraint violation after the pass (meters).
        residual: f32,
    },

    /// Constraint solver report for the timestep.
    Convergence {
        /// Iterations executed.
        iterations: u32,
        /// Largest violation after the final pass (meters).
        final_residual: f32,
        /// Whether the residual fell below tolerance.
        converged: bool,
    },

    /// An upstream input was non-finite or out of range and replaced by zero.
    InputRejected {
        /// Which input ("force", "torque", "handle_left", ...).
        source: String,
        /// Offending magnitude (NaN when non-finite).
        magnitude: f32,
    },

    /// A kinematic quantity hit its configured ceiling.
    MotionClamped {
        /// Which quantity ("acceleration", "velocity", ...).
        quantity: String,
        /// Magnitude before clamping.
        magnitude: f32,
        /// Configured ceiling.
        limit: f32,
    },

    /// Non-finite state was discarded and the previous valid pose restored.
    StateRecovered {
        /// What was corrupted ("position", "orientation", "solver").
        reason: String,
    },

    /// Constraint error increased over consecutive records.
    Divergence {
        /// Most recent errors, oldest first (meters).
        recent_errors: Vec<f32>,
    },

    /// The kite left its expected flight envelope.
    EnvelopeExceeded {
        /// Distance from the handle midpoint (meters).
        distance: f32,
        /// Nominal tether length (meters).
        nominal: f32,
    },

    /// Throttled periodic state summary.
    Summary {
        /// Simulated time (seconds).
        sim_time: f64,
        /// Kite position [x, y, z].
        position: [f32; 3],
        /// Speed (m/s).
        speed: f32,
        /// Largest constraint error (meters).
        max_error: f32,
        /// Left/right line tension (N).
        tension: [f32; 2],
    },

    /// Energy snapshot at current state.
    Energy {
        /// Translational + rotational kinetic energy (J).
        kinetic: f64,
        /// Gravitational potential energy relative to the ground (J).
        potential: f64,
    },

    /// Custom event for extensibility.
    Custom {
        /// Arbitrary label.
        label: String,
        /// JSON-encoded payload.
        payload: String,
    },
}

impl EventKind {
    /// Default severity for this payload.
    pub fn severity(&self) -> Severity {
        match self {
            EventKind::InputRejected { .. }
            | EventKind::StateRecovered { .. }
            | EventKind::Divergence { .. }
            | EventKind::EnvelopeExceeded { .. } => Severity::Warning,
            EventKind::MotionClamped { .. } | EventKind::Summary { .. } => Severity::Info,
            _ => Severity::Debug,
        }
    }

    /// Short stable label, used by sinks as the event name.
    pub fn label(&self) -> &str {
        match self {
            EventKind::TimestepBegin { .. } => "timestep_begin",
            EventKind::TimestepEnd { .. } => "timestep_end",
            EventKind::SolverIteration { .. } => "solver_iteration",
            EventKind::Convergence { .. } => "convergence",
            EventKind::InputRejected { .. } => "input_rejected",
            EventKind::MotionClamped { .. } => "motion_clamped",
            EventKind::StateRecovered { .. } => "state_recovered",
            EventKind::Divergence { .. } => "divergence",
            EventKind::EnvelopeExceeded { .. } => "envelope_exceeded",
            EventKind::Summary { .. } => "summary",
            EventKind::Energy { .. } => "energy",
            EventKind::Custom { label, .. } => label,
        }
    }
}

impl SimulationEvent {
    /// Creates a new event for the given timestep.
    pub fn new(timestep: u32, kind: EventKind) -> Self {
        Self { timestep, kind }
    }

    /// Severity of the payload.
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}
