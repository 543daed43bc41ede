//! Rigid-body integrator.
//!
//! Semi-implicit Euler with exponentially smoothed force and torque.
//! Linear motion is integrated first, the tentative pose is projected onto
//! the constraints, then angular motion is integrated. A non-finite state
//! is never kept: the last valid pose is restored with zero velocity.

use kitesim_math::{clamp_magnitude, integrate_rotation, sanitize, Vec3};
use kitesim_telemetry::{EventBus, EventKind, SimulationEvent};

use crate::config::{IntegratorConfig, SolverConfig};
use crate::constraints::ConstraintSet;
use crate::geometry::KiteGeometry;
use crate::pbd::{ConstraintSolver, SolveReport};
use crate::state::{Pose, RigidBodyState};

/// Anomalies raised during the most recent step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionWarnings {
    pub acceleration: bool,
    pub velocity: bool,
    pub angular_acceleration: bool,
    pub angular_velocity: bool,
    pub input_rejected: bool,
    pub recovered: bool,
}

impl MotionWarnings {
    pub fn any(&self) -> bool {
        self.acceleration
            || self.velocity
            || self.angular_acceleration
            || self.angular_velocity
            || self.input_rejected
            || self.recovered
    }

    /// Number of raised flags.
    pub fn count(&self) -> u32 {
        [
            self.acceleration,
            self.velocity,
            self.angular_acceleration,
            self.angular_velocity,
            self.input_rejected,
            self.recovered,
        ]
        .iter()
        .filter(|f| **f)
        .count() as u32
    }
}

/// Borrowed per-step collaborators.
pub struct StepContext<'a> {
    pub constraints: &'a ConstraintSet,
    pub geometry: &'a KiteGeometry,
    pub bus: &'a EventBus,
    pub timestep: u32,
}

/// Outcome of one controller step.
#[derive(Debug, Clone)]
pub struct ControllerStep {
    pub solve: SolveReport,
    pub warnings: MotionWarnings,
}

/// Owns the rigid-body state and advances it.
pub struct KiteController {
    state: RigidBodyState,
    integrator: IntegratorConfig,
    solver_config: SolverConfig,
    solver: Box<dyn ConstraintSolver>,
    smoothed_force: Vec3,
    smoothed_torque: Vec3,
    last_valid: Pose,
    warnings: MotionWarnings,
}

impl KiteController {
    pub fn new(
        state: RigidBodyState,
        integrator: IntegratorConfig,
        solver_config: SolverConfig,
        solver: Box<dyn ConstraintSolver>,
    ) -> Self {
        let smoothed_force = integrator.gravity() * state.mass;
        Self {
            last_valid: state.pose(),
            state,
            integrator,
            solver_config,
            solver,
            smoothed_force,
            smoothed_torque: Vec3::ZERO,
            warnings: MotionWarnings::default(),
        }
    }

    pub fn state(&self) -> &RigidBodyState {
        &self.state
    }

    /// Mutable state access for scripted setups (initial velocity, teleports).
    pub fn state_mut(&mut self) -> &mut RigidBodyState {
        &mut self.state
    }

    pub fn warnings(&self) -> MotionWarnings {
        self.warnings
    }

    pub fn smoothed_force(&self) -> Vec3 {
        self.smoothed_force
    }

    pub fn smoothed_torque(&self) -> Vec3 {
        self.smoothed_torque
    }

    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }

    pub fn integrator_config(&self) -> &IntegratorConfig {
        &self.integrator
    }

    pub fn set_force_smoothing_rate(&mut self, rate: f32) {
        self.integrator.force_smoothing_rate = rate;
    }

    /// Puts the body at rest in `pose` and reseeds the smoothed force with
    /// gravity alone.
    pub fn reset(&mut self, pose: Pose) {
        self.state.set_pose(pose);
        self.state.stop();
        self.smoothed_force = self.integrator.gravity() * self.state.mass;
        self.smoothed_torque = Vec3::ZERO;
        self.last_valid = self.state.pose();
        self.warnings = MotionWarnings::default();
    }

    /// Advances the body by `dt` under the given aerodynamic force and
    /// torque (world frame).
    pub fn step(
        &mut self,
        dt: f32,
        aero_force: Vec3,
        aero_torque: Vec3,
        ctx: &StepContext<'_>,
    ) -> ControllerStep {
        self.warnings = MotionWarnings::default();
        let cfg = self.integrator.clone();

        let force = self.accept_input("force", aero_force, cfg.max_force, ctx);
        let torque = self.accept_input("torque", aero_torque, cfg.max_torque, ctx);

        let blend = 1.0 - (-cfg.force_smoothing_rate * dt).exp();
        let raw_force = force + cfg.gravity() * self.state.mass;
        self.smoothed_force += (raw_force - self.smoothed_force) * blend;
        self.smoothed_torque += (torque - self.smoothed_torque) * blend;

        // Linear
        let (acceleration, clamped) =
            clamp_magnitude(self.smoothed_force / self.state.mass, cfg.max_acceleration);
        if clamped {
            self.warnings.acceleration = true;
            let magnitude = self.smoothed_force.length() / self.state.mass;
            self.report_clamp(ctx, "acceleration", magnitude, cfg.max_acceleration);
        }
        let mut velocity = self.state.velocity + acceleration * dt;
        velocity *= (-cfg.linear_damping * dt).exp();
        let speed = velocity.length();
        let (velocity, clamped) = clamp_magnitude(velocity, cfg.max_velocity);
        if clamped {
            self.warnings.velocity = true;
            self.report_clamp(ctx, "velocity", speed, cfg.max_velocity);
        }
        let mut velocity = velocity;
        let mut pose = Pose::new(self.state.position + velocity * dt, self.state.orientation);

        let solve = self.solver.solve(
            &mut pose,
            &mut velocity,
            ctx.constraints,
            ctx.geometry,
            self.state.mass_properties(),
            &self.solver_config,
        );
        if solve.rejected {
            self.recover("solver", ctx);
            return ControllerStep {
                solve,
                warnings: self.warnings,
            };
        }
        self.state.set_pose(pose);
        self.state.velocity = velocity;

        // Angular
        let inertia = self.state.inertia;
        let damping_torque = self.state.angular_velocity * cfg.angular_damping;
        let raw_angular = (self.smoothed_torque - damping_torque) / inertia;
        let (angular_acceleration, clamped) =
            clamp_magnitude(raw_angular, cfg.max_angular_acceleration);
        if clamped {
            self.warnings.angular_acceleration = true;
            let magnitude = raw_angular.length();
            self.report_clamp(ctx, "angular_acceleration", magnitude, cfg.max_angular_acceleration);
        }
        let omega = self.state.angular_velocity + angular_acceleration * dt;
        let spin = omega.length();
        let (omega, clamped) = clamp_magnitude(omega, cfg.max_angular_velocity);
        if clamped {
            self.warnings.angular_velocity = true;
            self.report_clamp(ctx, "angular_velocity", spin, cfg.max_angular_velocity);
        }
        self.state.angular_velocity = omega;
        self.state.orientation = integrate_rotation(self.state.orientation, omega, dt);

        if !self.state.position.is_finite() || !self.state.velocity.is_finite() {
            self.recover("position", ctx);
        } else if !self.state.orientation.is_finite() || !self.state.angular_velocity.is_finite() {
            self.recover("orientation", ctx);
        } else {
            self.last_valid = self.state.pose();
        }

        ControllerStep {
            solve,
            warnings: self.warnings,
        }
    }

    /// Returns `value` if usable, zero otherwise.
    fn accept_input(
        &mut self,
        source: &str,
        value: Vec3,
        ceiling: f32,
        ctx: &StepContext<'_>,
    ) -> Vec3 {
        match sanitize(value, ceiling) {
            Some(v) => v,
            None => {
                let magnitude = value.length();
                self.warnings.input_rejected = true;
                tracing::warn!(
                    timestep = ctx.timestep,
                    source,
                    magnitude,
                    ceiling,
                    "rejected aerodynamic input; substituting zero"
                );
                ctx.bus.emit(SimulationEvent::new(
                    ctx.timestep,
                    EventKind::InputRejected {
                        source: source.to_string(),
                        magnitude,
                    },
                ));
                Vec3::ZERO
            }
        }
    }

    fn report_clamp(&self, ctx: &StepContext<'_>, quantity: &str, magnitude: f32, limit: f32) {
        tracing::debug!(timestep = ctx.timestep, quantity, magnitude, limit, "motion clamped");
        ctx.bus.emit(SimulationEvent::new(
            ctx.timestep,
            EventKind::MotionClamped {
                quantity: quantity.to_string(),
                magnitude,
                limit,
            },
        ));
    }

    /// Restores the last valid pose with zero velocity.
    fn recover(&mut self, reason: &str, ctx: &StepContext<'_>) {
        self.warnings.recovered = true;
        tracing::warn!(
            timestep = ctx.timestep,
            reason,
            x = self.last_valid.position.x,
            y = self.last_valid.position.y,
            z = self.last_valid.position.z,
            "non-finite kite state; restoring last valid pose"
        );
        ctx.bus.emit(SimulationEvent::new(
            ctx.timestep,
            EventKind::StateRecovered {
                reason: reason.to_string(),
            },
        ));
        self.state.set_pose(self.last_valid);
        self.state.stop();
        if !self.smoothed_force.is_finite() || !self.smoothed_torque.is_finite() {
            self.smoothed_force = self.integrator.gravity() * self.state.mass;
            self.smoothed_torque = Vec3::ZERO;
        }
    }
}
