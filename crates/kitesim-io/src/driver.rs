//! Config-driven run loop: validates an input, steps a simulation for the
//! requested duration and summarizes the result.

use std::time::Instant;

use kitesim_debug::KiteSnapshot;
use kitesim_solver::simulation::{FrameInputs, KiteSimulation};
use kitesim_telemetry::EventBus;
use kitesim_types::KiteResult;

use crate::contract::{SimulationInput, SimulationMetrics, SimulationOutput};
use crate::validator::validate_input;

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output: SimulationOutput,
    /// State after the last step.
    pub snapshot: KiteSnapshot,
}

/// Validates `input` and runs it to completion with telemetry sent to `bus`.
///
/// Handles stay at their configured positions for the whole run; the
/// aerodynamic load follows `input.run`.
pub fn run_simulation(input: &SimulationInput, bus: EventBus) -> KiteResult<RunOutcome> {
    validate_input(input)?;

    let mut sim = KiteSimulation::new(input.config.clone(), bus)?;
    let handles = sim.handles();
    let frames = input.run.frames();
    let torque = input.run.torque();

    let mut metrics = SimulationMetrics::default();
    let start = Instant::now();

    for _ in 0..frames {
        let force = input.run.force_at(sim.sim_time() as f32);
        let inputs = FrameInputs::still(handles).with_force(force).with_torque(torque);
        let report = sim.step(input.run.dt, &inputs);

        if let Some(convergence) = &report.convergence {
            metrics.peak_max_error = metrics.peak_max_error.max(convergence.max_abs_error);
        }
        if report.warnings.any() {
            metrics.warning_steps += 1;
        }
        metrics.recoveries += u32::from(report.warnings.recovered);
        if !report.skipped {
            metrics.timestep_count += 1;
        }
    }

    metrics.wall_time_seconds = start.elapsed().as_secs_f64();
    metrics.final_max_error = sim
        .last_convergence()
        .map(|c| c.max_abs_error)
        .unwrap_or(0.0);
    metrics.final_speed = sim.state().speed();
    metrics.final_tension = sim.tension_report().line_tensions();
    metrics.final_asymmetry = sim.tension_report().asymmetry_percent;

    let state = sim.state();
    let output = SimulationOutput {
        final_position: state.position.to_array(),
        final_orientation: state.orientation.to_array(),
        metrics,
    };
    let snapshot = sim.snapshot();

    tracing::info!(
        steps = output.metrics.timestep_count,
        wall_time = output.metrics.wall_time_seconds,
        final_error = output.metrics.final_max_error,
        "simulation run complete"
    );
    sim.dispose();
    Ok(RunOutcome { output, snapshot })
}
