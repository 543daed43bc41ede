//! Benchmark metrics: data collected during a scenario run.

use serde::{Deserialize, Serialize};

/// Metrics collected from a scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioMetrics {
    /// Scenario name.
    pub scenario: String,
    /// Total wall-clock time (seconds).
    pub total_wall_time: f64,
    /// Number of timesteps executed.
    pub timesteps: u32,
    /// Average wall-clock time per timestep (seconds).
    pub avg_step_time: f64,
    /// Maximum step time.
    pub max_step_time: f64,
    /// Largest constraint error after the final step (meters).
    pub final_line_error: f32,
    /// Largest solver residual over the run (meters).
    pub max_residual: f32,
    /// Final speed (m/s).
    pub final_speed: f32,
    /// Lowest hull point height over the run (meters).
    pub min_hull_height: f32,
    /// Tension asymmetry after the final step (percent).
    pub final_asymmetry: f32,
    /// Tension asymmetry on the pull frame (percent), for pull scenarios.
    pub pull_asymmetry: Option<f32>,
    /// Dominant side on the pull frame ("left", "right", "balanced").
    pub pull_dominant: Option<String>,
    /// Steps that raised any motion warning.
    pub warning_steps: u32,
    /// Inputs replaced because they were unusable.
    pub rejected_inputs: u32,
    /// Steps that restored a previous pose.
    pub recoveries: u32,
    /// Whether the final state is finite.
    pub finite: bool,
}

impl ScenarioMetrics {
    /// Format as a CSV row (header + data).
    pub fn to_csv_header() -> String {
        "scenario,timesteps,total_wall_time_s,avg_step_ms,max_step_ms,final_line_error,max_residual,final_speed,min_hull_height,final_asymmetry,pull_asymmetry,pull_dominant,warning_steps,rejected_inputs,recoveries,finite".to_string()
    }

    /// Format this metrics instance as a CSV data row.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{:.6},{:.4},{:.4},{:.6},{:.6},{:.6},{:.6},{:.3},{},{},{},{},{},{}",
            self.scenario,
            self.timesteps,
            self.total_wall_time,
            self.avg_step_time * 1000.0,
            self.max_step_time * 1000.0,
            self.final_line_error,
            self.max_residual,
            self.final_speed,
            self.min_hull_height,
            self.final_asymmetry,
            self.pull_asymmetry.map(|a| format!("{a:.3}")).unwrap_or_default(),
            self.pull_dominant.as_deref().unwrap_or(""),
            self.warning_steps,
            self.rejected_inputs,
            self.recoveries,
            self.finite,
        )
    }

    /// Format multiple metrics as a complete CSV string.
    pub fn to_csv(metrics: &[ScenarioMetrics]) -> String {
        let mut csv = Self::to_csv_header();
        for m in metrics {
            csv.push('\n');
            csv.push_str(&m.to_csv_row());
        }
        csv
    }
}
