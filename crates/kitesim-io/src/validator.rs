//! Input validation.
//!
//! Validates simulation inputs before the core receives them, catching
//! configuration errors early with clear diagnostics.

use kitesim_solver::geometry::KiteGeometry;
use kitesim_types::{KiteError, KiteResult};

use crate::contract::{RunParams, SimulationInput};

/// Validates a complete simulation input.
///
/// Checks:
/// - Physics configuration values are physically meaningful
/// - Bridle lengths admit a control point on each side
/// - Run parameters are usable
pub fn validate_input(input: &SimulationInput) -> KiteResult<()> {
    input.config.validate()?;
    KiteGeometry::from_config(&input.config.geometry, &input.config.bridles)?;
    validate_run(&input.run)?;
    Ok(())
}

/// Validates run parameters.
fn validate_run(run: &RunParams) -> KiteResult<()> {
    if !(run.dt.is_finite() && run.dt > 0.0) {
        return Err(KiteError::InvalidConfig(
            "Timestep dt must be positive".into(),
        ));
    }
    if run.dt > 1.0 {
        return Err(KiteError::InvalidConfig(
            "Timestep dt > 1.0 is unreasonably large".into(),
        ));
    }
    if !(run.duration.is_finite() && run.duration > 0.0) {
        return Err(KiteError::InvalidConfig(
            "Duration must be positive".into(),
        ));
    }
    if !run.aero_force.iter().chain(&run.aero_torque).all(|c| c.is_finite()) {
        return Err(KiteError::InvalidConfig(
            "Aerodynamic force and torque must be finite".into(),
        ));
    }
    for (i, gust) in run.gusts.iter().enumerate() {
        if !(gust.start.is_finite() && gust.start >= 0.0) {
            return Err(KiteError::InvalidConfig(format!(
                "Gust {i}: start must be non-negative, got {}",
                gust.start
            )));
        }
        if !(gust.duration.is_finite() && gust.duration > 0.0) {
            return Err(KiteError::InvalidConfig(format!(
                "Gust {i}: duration must be positive, got {}",
                gust.duration
            )));
        }
        if !gust.force.iter().all(|c| c.is_finite()) {
            return Err(KiteError::InvalidConfig(format!(
                "Gust {i}: force must be finite"
            )));
        }
    }
    Ok(())
}
