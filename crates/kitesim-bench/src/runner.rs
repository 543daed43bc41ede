//! Scenario runner: executes scenarios and collects metrics.

use std::time::Instant;

use kitesim_solver::simulation::KiteSimulation;
use kitesim_solver::tension::DominantSide;
use kitesim_telemetry::EventBus;
use kitesim_types::KiteResult;

use crate::metrics::ScenarioMetrics;
use crate::scenarios::{Scenario, ScenarioKind};

/// Runs benchmark scenarios and collects metrics.
pub struct ScenarioRunner;

impl ScenarioRunner {
    /// Run a single scenario without telemetry sinks.
    pub fn run(scenario: &Scenario) -> KiteResult<ScenarioMetrics> {
        Self::run_with_bus(scenario, EventBus::new())
    }

    /// Run a single scenario, sending telemetry to `bus`.
    ///
    /// Returns metrics for the completed run.
    pub fn run_with_bus(scenario: &Scenario, bus: EventBus) -> KiteResult<ScenarioMetrics> {
        let mut sim = KiteSimulation::new(scenario.config.clone(), bus)?;
        let base = sim.handles();
        let pull_step = scenario.pull_step();

        let mut step_times: Vec<f64> = Vec::with_capacity(scenario.timesteps as usize);
        let mut max_residual = 0.0_f32;
        let mut min_hull_height = f32::MAX;
        let mut warning_steps = 0;
        let mut rejected_inputs = 0;
        let mut recoveries = 0;
        let mut pull = None;

        let total_start = Instant::now();

        for step in 0..scenario.timesteps {
            let inputs = scenario.inputs_at(step, base);
            let start = Instant::now();
            let report = sim.step(scenario.dt, &inputs);
            step_times.push(start.elapsed().as_secs_f64());

            if let Some(solve) = &report.solve {
                max_residual = max_residual.max(solve.final_residual());
            }
            let (_, lowest) = sim.geometry().lowest_hull_point(&sim.state().pose());
            min_hull_height = min_hull_height.min(lowest.y);

            if report.warnings.any() {
                warning_steps += 1;
            }
            rejected_inputs += u32::from(report.warnings.input_rejected);
            rejected_inputs += u32::from(report.handle_rejected);
            recoveries += u32::from(report.warnings.recovered);

            if pull_step == Some(step) {
                let tension = sim.tension_report();
                pull = Some((tension.asymmetry_percent, tension.dominant));
            }
        }

        let total_wall_time = total_start.elapsed().as_secs_f64();

        let avg_step_time = if step_times.is_empty() {
            0.0
        } else {
            step_times.iter().sum::<f64>() / step_times.len() as f64
        };
        let max_step_time = step_times.iter().copied().fold(0.0, f64::max);
        let final_line_error = sim
            .last_convergence()
            .map(|c| c.max_abs_error)
            .unwrap_or(0.0);

        let metrics = ScenarioMetrics {
            scenario: scenario.kind.name().to_string(),
            total_wall_time,
            timesteps: scenario.timesteps,
            avg_step_time,
            max_step_time,
            final_line_error,
            max_residual,
            final_speed: sim.state().speed(),
            min_hull_height,
            final_asymmetry: sim.tension_report().asymmetry_percent,
            pull_asymmetry: pull.map(|(a, _)| a),
            pull_dominant: pull.map(|(_, d)| dominant_name(d).to_string()),
            warning_steps,
            rejected_inputs,
            recoveries,
            finite: sim.state().is_finite(),
        };
        tracing::info!(
            scenario = %metrics.scenario,
            steps = metrics.timesteps,
            wall_time = metrics.total_wall_time,
            final_line_error = metrics.final_line_error,
            "scenario complete"
        );
        sim.dispose();
        Ok(metrics)
    }

    /// Run all scenarios and return metrics for each.
    pub fn run_all() -> KiteResult<Vec<ScenarioMetrics>> {
        let mut results = Vec::new();
        for &kind in ScenarioKind::all() {
            let scenario = Scenario::from_kind(kind)?;
            let metrics = Self::run(&scenario)?;
            results.push(metrics);
        }
        Ok(results)
    }
}

fn dominant_name(side: DominantSide) -> &'static str {
    match side {
        DominantSide::Left => "left",
        DominantSide::Right => "right",
        DominantSide::Balanced => "balanced",
    }
}
