//! Simulation driver: owns every component and runs the per-frame pipeline.
//!
//! ```text
//! let mut sim = KiteSimulation::new(config, bus)?;
//! loop {
//!     let report = sim.step(dt, &inputs);
//! }
//! sim.dispose();
//! ```

use std::time::Instant;

use kitesim_debug::{ConstraintDiagnostics, ConvergenceReport, KiteSnapshot, StepObservation};
use kitesim_math::Vec3;
use kitesim_telemetry::{EventBus, EventKind, SimulationEvent};
use kitesim_types::{KiteError, KiteResult, Side};

use crate::config::KiteConfig;
use crate::constraints::{ConstraintSet, HandlePositions};
use crate::controller::{KiteController, MotionWarnings, StepContext};
use crate::geometry::{BridleLengths, KiteGeometry};
use crate::pbd::{ConstraintSolver, PositionBasedSolver, SolveReport};
use crate::state::{Pose, RigidBodyState};
use crate::tension::{TensionModel, TensionReport};

/// Per-frame inputs from the outer application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    /// Aerodynamic force on the center of mass (world frame, N).
    pub aero_force: Vec3,
    /// Aerodynamic torque (world frame, N·m).
    pub aero_torque: Vec3,
    pub handles: HandlePositions,
}

impl FrameInputs {
    /// No aerodynamic load; handles held at `handles`.
    pub fn still(handles: HandlePositions) -> Self {
        Self {
            aero_force: Vec3::ZERO,
            aero_torque: Vec3::ZERO,
            handles,
        }
    }

    pub fn with_force(mut self, force: Vec3) -> Self {
        self.aero_force = force;
        self
    }

    pub fn with_torque(mut self, torque: Vec3) -> Self {
        self.aero_torque = torque;
        self
    }
}

/// Outcome of one [`KiteSimulation::step`].
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Index of the step (0 for the first step after setup or reset).
    pub timestep: u32,
    /// Simulated time after the step (seconds).
    pub sim_time: f64,
    /// Integrated timestep after clamping; 0 when skipped.
    pub dt: f32,
    /// The step was not integrated because `dt` was unusable.
    pub skipped: bool,
    pub solve: Option<SolveReport>,
    pub convergence: Option<ConvergenceReport>,
    pub warnings: MotionWarnings,
    /// A non-finite handle position was replaced by the previous one.
    pub handle_rejected: bool,
}

/// The tethered kite physics core.
pub struct KiteSimulation {
    config: KiteConfig,
    geometry: KiteGeometry,
    constraints: ConstraintSet,
    controller: KiteController,
    tension: TensionModel,
    tension_report: TensionReport,
    diagnostics: ConstraintDiagnostics,
    bus: EventBus,
    last_solve: Option<SolveReport>,
    sim_time: f64,
    timestep: u32,
}

impl KiteSimulation {
    /// Validates `config`, derives the geometry and places the kite at rest
    /// in its initial pose.
    pub fn new(config: KiteConfig, bus: EventBus) -> KiteResult<Self> {
        Self::with_solver(config, bus, Box::new(PositionBasedSolver::new()))
    }

    /// Like [`new`](Self::new) with a custom projection back-end.
    pub fn with_solver(
        config: KiteConfig,
        bus: EventBus,
        solver: Box<dyn ConstraintSolver>,
    ) -> KiteResult<Self> {
        config.validate()?;
        let geometry = KiteGeometry::from_config(&config.geometry, &config.bridles)?;
        let constraints = ConstraintSet::new(
            config_handles(&config),
            config.lines.length,
            config.solver.ground_height,
        );
        let state = RigidBodyState::at_rest(
            initial_pose(&config),
            config.kite.mass,
            config.kite.inertia,
        );
        let controller = KiteController::new(
            state,
            config.integrator.clone(),
            config.solver.clone(),
            solver,
        );
        let mut tension = TensionModel::new(config.tension.clone());
        let tension_report =
            tension.evaluate(&controller.state().pose(), &geometry, &constraints, None, 0.0);

        tracing::info!(
            solver = controller.solver_name(),
            line_length = config.lines.length,
            iterations = config.solver.iterations,
            sinks = bus.sink_count(),
            "kite simulation initialized"
        );

        Ok(Self {
            diagnostics: ConstraintDiagnostics::new(config.diagnostics.clone()),
            config,
            geometry,
            constraints,
            controller,
            tension,
            tension_report,
            bus,
            last_solve: None,
            sim_time: 0.0,
            timestep: 0,
        })
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// Never fails: unusable `dt` skips the step, bad inputs are replaced
    /// and corrupted state is reverted. Anomalies surface through the
    /// report, [`warnings`](Self::warnings) and telemetry.
    pub fn step(&mut self, dt: f32, inputs: &FrameInputs) -> StepReport {
        if !dt.is_finite() || dt <= 0.0 {
            tracing::warn!(timestep = self.timestep, dt, "unusable timestep; step skipped");
            return StepReport {
                timestep: self.timestep,
                sim_time: self.sim_time,
                dt: 0.0,
                skipped: true,
                solve: None,
                convergence: None,
                warnings: MotionWarnings::default(),
                handle_rejected: false,
            };
        }
        let max_dt = self.config.integrator.max_dt;
        if dt > max_dt {
            tracing::debug!(timestep = self.timestep, dt, max_dt, "timestep clamped");
        }
        let dt = dt.min(max_dt);
        let start = Instant::now();
        let timestep = self.timestep;

        self.bus.emit(SimulationEvent::new(
            timestep,
            EventKind::TimestepBegin {
                sim_time: self.sim_time,
                dt,
            },
        ));

        let handle_rejected = self.accept_handles(inputs.handles);

        let ctx = StepContext {
            constraints: &self.constraints,
            geometry: &self.geometry,
            bus: &self.bus,
            timestep,
        };
        let outcome = self
            .controller
            .step(dt, inputs.aero_force, inputs.aero_torque, &ctx);
        self.sim_time += dt as f64;

        let state = self.controller.state();
        let pose = state.pose();
        self.tension_report = self.tension.evaluate(
            &pose,
            &self.geometry,
            &self.constraints,
            Some(&outcome.solve.lines),
            dt,
        );

        let samples = self.constraints.samples(&pose, &self.geometry);
        let observation = StepObservation {
            timestep,
            sim_time: self.sim_time,
            samples: &samples,
            iteration_residuals: &outcome.solve.residuals,
            kite_position: pose.position,
            anchor: self.constraints.handles().midpoint(),
            nominal_length: self.constraints.line_length(),
            speed: state.speed(),
            tension: self.tension_report.line_tensions(),
            kinetic_energy: state.kinetic_energy(),
            potential_energy: state
                .potential_energy(self.config.integrator.gravity(), self.config.solver.ground_height),
        };
        let convergence = self.diagnostics.observe(&observation, &self.bus);

        self.bus.emit(SimulationEvent::new(
            timestep,
            EventKind::TimestepEnd {
                wall_time: start.elapsed().as_secs_f64(),
            },
        ));
        self.bus.flush();
        self.timestep += 1;

        let report = StepReport {
            timestep,
            sim_time: self.sim_time,
            dt,
            skipped: false,
            solve: Some(outcome.solve.clone()),
            convergence: Some(convergence),
            warnings: outcome.warnings,
            handle_rejected,
        };
        self.last_solve = Some(outcome.solve);
        report
    }

    /// Keeps the previous handle for any side whose new position is not
    /// finite. Returns true if any side was rejected.
    fn accept_handles(&mut self, handles: HandlePositions) -> bool {
        let mut accepted = self.constraints.handles();
        let mut rejected = false;
        for side in Side::BOTH {
            let incoming = handles.get(side);
            if incoming.is_finite() {
                match side {
                    Side::Left => accepted.left = incoming,
                    Side::Right => accepted.right = incoming,
                }
                continue;
            }
            let source = match side {
                Side::Left => "handle_left",
                Side::Right => "handle_right",
            };
            rejected = true;
            tracing::warn!(timestep = self.timestep, source, "non-finite handle; keeping previous");
            self.bus.emit(SimulationEvent::new(
                self.timestep,
                EventKind::InputRejected {
                    source: source.to_string(),
                    magnitude: f32::NAN,
                },
            ));
        }
        self.constraints.set_handles(accepted);
        rejected
    }

    /// Returns the kite to its initial pose at rest.
    ///
    /// Clears smoothed force (back to gravity alone), torque, diagnostics,
    /// tension history, time and step counters. Handles return to their
    /// configured positions; tuned line and bridle lengths are kept.
    pub fn reset(&mut self) {
        self.controller.reset(initial_pose(&self.config));
        self.constraints.set_handles(config_handles(&self.config));
        self.diagnostics.reset();
        self.tension.reset();
        self.tension_report = self.tension.evaluate(
            &self.controller.state().pose(),
            &self.geometry,
            &self.constraints,
            None,
            0.0,
        );
        self.last_solve = None;
        self.sim_time = 0.0;
        self.timestep = 0;
        tracing::info!("kite simulation reset");
    }

    /// Flushes and finalizes telemetry, then drops the simulation.
    pub fn dispose(mut self) {
        self.bus.flush();
        self.bus.finalize();
        tracing::info!(steps = self.timestep, sim_time = self.sim_time, "kite simulation disposed");
    }

    // ─── Tuning ──────────────────────────────────────────────

    /// Sets both lines' rest length (meters).
    pub fn set_line_length(&mut self, length: f32) -> KiteResult<()> {
        if !(length.is_finite() && length >= 0.0) {
            return Err(KiteError::InvalidConfig(format!(
                "line length must be non-negative and finite, got {length}"
            )));
        }
        self.constraints.set_line_length(length);
        self.config.lines.length = length;
        tracing::info!(length, "line length tuned");
        Ok(())
    }

    /// Replaces one side's bridle lengths and re-derives its control point.
    ///
    /// Nothing changes if the new lengths are infeasible.
    pub fn set_bridle_lengths(&mut self, side: Side, lengths: BridleLengths) -> KiteResult<()> {
        let geometry = self.geometry.with_bridles(side, lengths)?;
        self.geometry = geometry;
        match side {
            Side::Left => self.config.bridles.left = lengths,
            Side::Right => self.config.bridles.right = lengths,
        }
        let control = self.geometry.control_point(side);
        tracing::info!(
            %side,
            nose = lengths.nose,
            inter = lengths.inter,
            centre = lengths.centre,
            x = control.x,
            y = control.y,
            z = control.z,
            "bridle lengths tuned"
        );
        Ok(())
    }

    /// Sets the exponential force/torque smoothing rate (1/s).
    pub fn set_force_smoothing_rate(&mut self, rate: f32) -> KiteResult<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(KiteError::InvalidConfig(format!(
                "force smoothing rate must be positive and finite, got {rate}"
            )));
        }
        self.controller.set_force_smoothing_rate(rate);
        self.config.integrator.force_smoothing_rate = rate;
        Ok(())
    }

    // ─── Views ───────────────────────────────────────────────

    pub fn state(&self) -> &RigidBodyState {
        self.controller.state()
    }

    /// Mutable state access for scripted setups.
    pub fn state_mut(&mut self) -> &mut RigidBodyState {
        self.controller.state_mut()
    }

    pub fn config(&self) -> &KiteConfig {
        &self.config
    }

    pub fn geometry(&self) -> &KiteGeometry {
        &self.geometry
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn handles(&self) -> HandlePositions {
        self.constraints.handles()
    }

    pub fn tension_report(&self) -> &TensionReport {
        &self.tension_report
    }

    pub fn warnings(&self) -> MotionWarnings {
        self.controller.warnings()
    }

    pub fn last_convergence(&self) -> Option<&ConvergenceReport> {
        self.diagnostics.last_report()
    }

    pub fn last_solve(&self) -> Option<&SolveReport> {
        self.last_solve.as_ref()
    }

    pub fn diagnostics(&self) -> &ConstraintDiagnostics {
        &self.diagnostics
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn timestep(&self) -> u32 {
        self.timestep
    }

    /// Current world-space line lengths (left, right).
    pub fn line_lengths(&self) -> [f32; 2] {
        let pose = self.state().pose();
        Side::BOTH.map(|side| self.constraints.line(side).length(&pose, &self.geometry))
    }

    pub fn snapshot(&self) -> KiteSnapshot {
        let s = self.state();
        KiteSnapshot::new(
            self.timestep,
            self.sim_time,
            s.position,
            s.orientation,
            s.velocity,
            s.angular_velocity,
            self.line_lengths(),
        )
    }
}

fn config_handles(config: &KiteConfig) -> HandlePositions {
    HandlePositions::new(
        Vec3::from_array(config.lines.handle_left),
        Vec3::from_array(config.lines.handle_right),
    )
}

fn initial_pose(config: &KiteConfig) -> Pose {
    Pose::new(config.initial.position(), config.initial.orientation())
}
