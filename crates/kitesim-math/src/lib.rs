//! # kitesim-math
//!
//! Geometry primitives for the kitesim physics core.
//!
//! Provides:
//! - Re-exports of `glam` types (`Vec3`, `Quat`, `DVec3`)
//! - Finite-checks, magnitude clamps and rotation integration helpers
//! - Closed-form trilateration (control-point placement from bridle lengths)

pub mod trilateration;
pub mod vector;

// Re-export glam types as the canonical math types for kitesim.
pub use glam::{DQuat, DVec3, Quat, Vec3};

pub use trilateration::{trilaterate, trilaterate_f64, trilaterate_toward, Trilateration};
pub use vector::{clamp_magnitude, integrate_rotation, sanitize};
