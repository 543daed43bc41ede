//! Simulation configuration.
//!
//! Every tunable of the physics core, grouped by the component that reads
//! it. All groups deserialize with defaults so partial config files work.

use kitesim_debug::DiagnosticsConfig;
use kitesim_math::{Quat, Vec3};
use kitesim_types::constants::{
    DEFAULT_CONVERGENCE_TOLERANCE, DEFAULT_SOLVER_ITERATIONS, GRAVITY, MAX_DT,
};
use kitesim_types::{KiteError, KiteResult};
use serde::{Deserialize, Serialize};

use crate::geometry::BridleLengths;

/// Mass properties of the kite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KiteParams {
    /// Mass (kg).
    pub mass: f32,
    /// Isotropic moment of inertia (kg·m²).
    pub inertia: f32,
}

impl Default for KiteParams {
    fn default() -> Self {
        Self {
            mass: 0.31,
            inertia: 0.053,
        }
    }
}

/// Rigid-body integrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Gravity vector [gx, gy, gz] in m/s². Y is up.
    pub gravity: [f32; 3],
    /// Continuous-time linear damping coefficient (1/s): v *= exp(-c·dt).
    pub linear_damping: f32,
    /// Angular damping torque coefficient (N·m·s/rad).
    pub angular_damping: f32,
    /// Exponential blend rate of raw force/torque into the smoothed values (1/s).
    pub force_smoothing_rate: f32,
    /// Raw aerodynamic force above this magnitude is rejected (N).
    pub max_force: f32,
    /// Raw aerodynamic torque above this magnitude is rejected (N·m).
    pub max_torque: f32,
    /// Linear acceleration clamp (m/s²).
    pub max_acceleration: f32,
    /// Linear velocity clamp (m/s).
    pub max_velocity: f32,
    /// Angular acceleration clamp (rad/s²).
    pub max_angular_acceleration: f32,
    /// Angular velocity clamp (rad/s).
    pub max_angular_velocity: f32,
    /// Longest timestep integrated in one step (seconds).
    pub max_dt: f32,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -GRAVITY, 0.0],
            linear_damping: 0.5,
            angular_damping: 0.05,
            force_smoothing_rate: 20.0,
            max_force: 1000.0,
            max_torque: 200.0,
            max_acceleration: 150.0,
            max_velocity: 40.0,
            max_angular_acceleration: 500.0,
            max_angular_velocity: 25.0,
            max_dt: MAX_DT,
        }
    }
}

impl IntegratorConfig {
    pub fn gravity(&self) -> Vec3 {
        Vec3::from_array(self.gravity)
    }
}

/// Constraint solver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Projection passes per timestep.
    pub iterations: u32,

    /// Residual below which the step counts as converged (meters).
    pub tolerance: f32,

    /// Stop iterating once the residual is below tolerance.
    /// Off by default: the fixed budget keeps per-frame cost constant.
    pub early_exit: bool,

    /// Scales the rotational share of line corrections (0 = translate only).
    pub angular_coupling: f32,

    /// Largest rotation a single correction may apply (radians).
    pub max_correction_angle: f32,

    /// Ground plane height (Y coordinate).
    pub ground_height: f32,

    /// Fraction of tangential velocity removed on ground contact.
    pub ground_friction: f32,

    /// A line within this distance of its target counts as taut (meters).
    pub taut_slop: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_SOLVER_ITERATIONS,
            tolerance: DEFAULT_CONVERGENCE_TOLERANCE,
            early_exit: false,
            angular_coupling: 1.0,
            max_correction_angle: 0.25,
            ground_height: 0.0,
            ground_friction: 0.5,
            taut_slop: 1.0e-3,
        }
    }
}

impl SolverConfig {
    /// Creates a config for debugging (fewer iterations, looser tolerance).
    pub fn debug() -> Self {
        Self {
            iterations: 3,
            tolerance: 0.05,
            ..Default::default()
        }
    }

    /// Creates a high-quality config (more iterations, tighter tolerance).
    pub fn high_quality() -> Self {
        Self {
            iterations: 20,
            tolerance: 1.0e-3,
            ..Default::default()
        }
    }
}

/// Tension read-model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TensionConfig {
    /// Spring stiffness used to report line tension (N/m).
    pub line_stiffness: f32,
    /// Spring stiffness used to report bridle tension (N/m).
    pub bridle_stiffness: f32,
    /// Line tension ceiling (N).
    pub max_line_tension: f32,
    /// Bridle tension ceiling (N).
    pub max_bridle_tension: f32,
    /// Rescale bridle tensions so each side sums to its line tension.
    pub conserve_bridles: bool,
    /// Relative band inside which the bridle sum is left alone.
    pub conservation_band: f32,
    /// Asymmetry (percent) above which one side is reported dominant.
    pub asymmetry_threshold: f32,
}

impl Default for TensionConfig {
    fn default() -> Self {
        Self {
            line_stiffness: 500.0,
            bridle_stiffness: 2000.0,
            max_line_tension: 800.0,
            max_bridle_tension: 800.0,
            conserve_bridles: true,
            conservation_band: 0.10,
            asymmetry_threshold: 10.0,
        }
    }
}

/// Kite-frame structural points (meters, origin at the center of mass).
///
/// X spans the wings (left is −X), Y runs up the spine, +Z faces the pilot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub nose: [f32; 3],
    pub spine_base: [f32; 3],
    pub left_tip: [f32; 3],
    pub right_tip: [f32; 3],
    pub inter_left: [f32; 3],
    pub inter_right: [f32; 3],
    pub centre: [f32; 3],
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            nose: [0.0, 0.45, 0.0],
            spine_base: [0.0, -0.25, 0.0],
            left_tip: [-0.8, -0.2, 0.0],
            right_tip: [0.8, -0.2, 0.0],
            inter_left: [-0.35, -0.05, 0.0],
            inter_right: [0.35, -0.05, 0.0],
            centre: [0.0, 0.05, 0.0],
        }
    }
}

/// Bridle rest lengths for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridleConfig {
    pub left: BridleLengths,
    pub right: BridleLengths,
}

/// Control line configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Rest length of both lines (meters).
    pub length: f32,
    /// Handle positions at setup and after reset.
    pub handle_left: [f32; 3],
    pub handle_right: [f32; 3],
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            length: 15.0,
            handle_left: [-0.25, 1.2, 0.0],
            handle_right: [0.25, 1.2, 0.0],
        }
    }
}

/// Pose the kite starts in and returns to on reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialState {
    pub position: [f32; 3],
    /// Quaternion [x, y, z, w].
    pub orientation: [f32; 4],
}

impl Default for InitialState {
    fn default() -> Self {
        Self {
            position: [0.0, 8.0, -12.5],
            orientation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl InitialState {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_array(self.orientation).normalize()
    }
}

/// Complete physics configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KiteConfig {
    pub kite: KiteParams,
    pub geometry: GeometryConfig,
    pub bridles: BridleConfig,
    pub lines: LineConfig,
    pub initial: InitialState,
    pub integrator: IntegratorConfig,
    pub solver: SolverConfig,
    pub tension: TensionConfig,
    pub diagnostics: DiagnosticsConfig,
}

fn positive(name: &str, value: f32) -> KiteResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(KiteError::InvalidConfig(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

fn non_negative(name: &str, value: f32) -> KiteResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(KiteError::InvalidConfig(format!(
            "{name} must be non-negative and finite, got {value}"
        )))
    }
}

fn finite3(name: &str, v: [f32; 3]) -> KiteResult<()> {
    if v.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(KiteError::InvalidConfig(format!("{name} must be finite, got {v:?}")))
    }
}

impl KiteConfig {
    /// Checks that every value is physically meaningful.
    ///
    /// Geometry feasibility (bridles meeting at a point) is checked when the
    /// geometry is built.
    pub fn validate(&self) -> KiteResult<()> {
        positive("kite.mass", self.kite.mass)?;
        positive("kite.inertia", self.kite.inertia)?;

        let i = &self.integrator;
        finite3("integrator.gravity", i.gravity)?;
        non_negative("integrator.linear_damping", i.linear_damping)?;
        non_negative("integrator.angular_damping", i.angular_damping)?;
        positive("integrator.force_smoothing_rate", i.force_smoothing_rate)?;
        positive("integrator.max_force", i.max_force)?;
        positive("integrator.max_torque", i.max_torque)?;
        positive("integrator.max_acceleration", i.max_acceleration)?;
        positive("integrator.max_velocity", i.max_velocity)?;
        positive("integrator.max_angular_acceleration", i.max_angular_acceleration)?;
        positive("integrator.max_angular_velocity", i.max_angular_velocity)?;
        positive("integrator.max_dt", i.max_dt)?;

        let s = &self.solver;
        if s.iterations == 0 {
            return Err(KiteError::InvalidConfig(
                "solver.iterations must be >= 1".into(),
            ));
        }
        positive("solver.tolerance", s.tolerance)?;
        if !(0.0..=1.0).contains(&s.angular_coupling) {
            return Err(KiteError::InvalidConfig(format!(
                "solver.angular_coupling must be in [0, 1], got {}",
                s.angular_coupling
            )));
        }
        positive("solver.max_correction_angle", s.max_correction_angle)?;
        if !s.ground_height.is_finite() {
            return Err(KiteError::InvalidConfig("solver.ground_height must be finite".into()));
        }
        if !(0.0..=1.0).contains(&s.ground_friction) {
            return Err(KiteError::InvalidConfig(format!(
                "solver.ground_friction must be in [0, 1], got {}",
                s.ground_friction
            )));
        }
        non_negative("solver.taut_slop", s.taut_slop)?;

        let t = &self.tension;
        non_negative("tension.line_stiffness", t.line_stiffness)?;
        non_negative("tension.bridle_stiffness", t.bridle_stiffness)?;
        non_negative("tension.max_line_tension", t.max_line_tension)?;
        non_negative("tension.max_bridle_tension", t.max_bridle_tension)?;
        non_negative("tension.conservation_band", t.conservation_band)?;
        non_negative("tension.asymmetry_threshold", t.asymmetry_threshold)?;

        non_negative("lines.length", self.lines.length)?;
        finite3("lines.handle_left", self.lines.handle_left)?;
        finite3("lines.handle_right", self.lines.handle_right)?;
        finite3("initial.position", self.initial.position)?;
        let q = Quat::from_array(self.initial.orientation);
        if !q.is_finite() || q.length() < 1.0e-3 {
            return Err(KiteError::InvalidConfig(
                "initial.orientation must be a non-zero finite quaternion".into(),
            ));
        }

        for side in [&self.bridles.left, &self.bridles.right] {
            positive("bridles.nose", side.nose)?;
            positive("bridles.inter", side.inter)?;
            positive("bridles.centre", side.centre)?;
        }

        let d = &self.diagnostics;
        positive("diagnostics.tolerance", d.tolerance)?;
        if d.history_len < 3 {
            return Err(KiteError::InvalidConfig(
                "diagnostics.history_len must be >= 3".into(),
            ));
        }
        if !(d.summary_interval.is_finite() && d.summary_interval >= 0.0) {
            return Err(KiteError::InvalidConfig(
                "diagnostics.summary_interval must be non-negative".into(),
            ));
        }
        non_negative("diagnostics.envelope_margin", d.envelope_margin)?;

        Ok(())
    }
}
