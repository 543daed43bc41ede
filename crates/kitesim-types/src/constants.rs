//! Physical constants and simulation defaults.

/// Gravitational acceleration (m/s²).
pub const GRAVITY: f32 = 9.81;

/// Default simulation timestep (seconds). 1/60th of a second.
pub const DEFAULT_DT: f32 = 1.0 / 60.0;

/// Largest timestep a single step will integrate. Longer frame hitches are clamped.
pub const MAX_DT: f32 = 1.0 / 20.0;

/// Default number of constraint projection passes per timestep.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 10;

/// Default residual tolerance for the convergence diagnostic (meters).
pub const DEFAULT_CONVERGENCE_TOLERANCE: f32 = 0.01;

/// Epsilon for near-zero lengths and magnitudes.
pub const EPSILON: f32 = 1.0e-6;

/// Epsilon used by the `f64` geometry routines.
pub const GEOMETRY_EPSILON: f64 = 1.0e-9;
