//! Simulation input/output contract types.
//!
//! These types define the I/O boundary of the kite physics core. They are
//! serializable for CLI configuration files (TOML or JSON) and run reports.

use std::path::Path;

use kitesim_math::Vec3;
use kitesim_solver::config::KiteConfig;
use kitesim_types::constants::DEFAULT_DT;
use kitesim_types::{KiteError, KiteResult};
use serde::{Deserialize, Serialize};

/// Complete input specification for a simulation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationInput {
    /// Physics configuration.
    pub config: KiteConfig,
    /// Run length and scripted aerodynamic load.
    pub run: RunParams,
}

impl SimulationInput {
    pub fn from_toml_str(text: &str) -> KiteResult<Self> {
        toml::from_str(text).map_err(|e| KiteError::Serialization(format!("TOML: {e}")))
    }

    pub fn from_json_str(text: &str) -> KiteResult<Self> {
        serde_json::from_str(text).map_err(|e| KiteError::Serialization(format!("JSON: {e}")))
    }

    pub fn to_toml_string(&self) -> KiteResult<String> {
        toml::to_string_pretty(self).map_err(|e| KiteError::Serialization(format!("TOML: {e}")))
    }

    /// Loads an input file. `.json` files are read as JSON, anything else
    /// as TOML.
    pub fn load(path: impl AsRef<Path>) -> KiteResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let input = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text)?,
            _ => Self::from_toml_str(&text)?,
        };
        tracing::debug!(path = %path.display(), "loaded simulation input");
        Ok(input)
    }
}

/// A temporary extra aerodynamic force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gust {
    /// Start time (seconds).
    pub start: f32,
    /// Length (seconds).
    pub duration: f32,
    /// Force added while active (N, world frame).
    pub force: [f32; 3],
}

impl Gust {
    pub fn is_active(&self, time: f32) -> bool {
        time >= self.start && time < self.start + self.duration
    }
}

/// Run parameters for a scripted simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    /// Total simulated time in seconds.
    pub duration: f32,
    /// Timestep in seconds (e.g., 1/60).
    pub dt: f32,
    /// Constant aerodynamic force (N, world frame).
    pub aero_force: [f32; 3],
    /// Constant aerodynamic torque (N·m, world frame).
    pub aero_torque: [f32; 3],
    /// Temporary forces on top of the constant load.
    pub gusts: Vec<Gust>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            duration: 10.0,
            dt: DEFAULT_DT,
            aero_force: [0.0; 3],
            aero_torque: [0.0; 3],
            gusts: Vec::new(),
        }
    }
}

impl RunParams {
    /// Number of steps needed to cover `duration`.
    pub fn frames(&self) -> u32 {
        if self.dt > 0.0 {
            (self.duration / self.dt).ceil() as u32
        } else {
            0
        }
    }

    /// Aerodynamic force at simulated time `time`.
    pub fn force_at(&self, time: f32) -> Vec3 {
        self.gusts
            .iter()
            .filter(|g| g.is_active(time))
            .fold(Vec3::from_array(self.aero_force), |f, g| {
                f + Vec3::from_array(g.force)
            })
    }

    pub fn torque(&self) -> Vec3 {
        Vec3::from_array(self.aero_torque)
    }
}

/// Output from a completed simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    /// Final kite position [x, y, z].
    pub final_position: [f32; 3],
    /// Final orientation quaternion [x, y, z, w].
    pub final_orientation: [f32; 4],
    /// Run-wide metrics.
    pub metrics: SimulationMetrics,
}

/// Aggregate metrics from a simulation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationMetrics {
    /// Total wall-clock time (seconds).
    pub wall_time_seconds: f64,
    /// Number of timesteps executed.
    pub timestep_count: u32,
    /// Largest constraint error at the final step (meters).
    pub final_max_error: f32,
    /// Largest constraint error over the run (meters).
    pub peak_max_error: f32,
    /// Final speed (m/s).
    pub final_speed: f32,
    /// Final left/right line tension (N).
    pub final_tension: [f32; 2],
    /// Final tension asymmetry (percent).
    pub final_asymmetry: f32,
    /// Steps that raised any motion warning.
    pub warning_steps: u32,
    /// Steps that restored a previous pose.
    pub recoveries: u32,
}
