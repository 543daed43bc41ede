//! Constraint diagnostics.
//!
//! A pure observer of the solver: it turns per-constraint lengths into error
//! statistics, keeps a short rolling history of residuals to spot
//! divergence, and emits throttled summaries and elevated notices to the
//! event bus. Nothing here writes simulation state.

use std::collections::VecDeque;

use kitesim_math::Vec3;
use kitesim_telemetry::events::{EventKind, SimulationEvent};
use kitesim_telemetry::EventBus;
use kitesim_types::constants::{DEFAULT_CONVERGENCE_TOLERANCE, EPSILON};
use kitesim_types::ConstraintCategory;
use serde::{Deserialize, Serialize};

/// Diagnostics tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Max absolute error below which a step counts as converged (meters).
    pub tolerance: f32,
    /// Residual records kept for divergence detection (at least 3).
    pub history_len: usize,
    /// Minimum simulated time between summaries (seconds).
    pub summary_interval: f64,
    /// Fractional excess over line length that counts as leaving the envelope.
    pub envelope_margin: f32,
    /// Emit one `SolverIteration` event per projection pass.
    pub emit_iterations: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_CONVERGENCE_TOLERANCE,
            history_len: 8,
            summary_interval: 1.0,
            envelope_margin: 0.25,
            emit_iterations: false,
        }
    }
}

/// One constraint's measured and target length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintSample {
    pub name: &'static str,
    pub current: f32,
    pub target: f32,
    pub category: ConstraintCategory,
}

impl ConstraintSample {
    pub fn new(name: &'static str, current: f32, target: f32, category: ConstraintCategory) -> Self {
        Self {
            name,
            current,
            target,
            category,
        }
    }

    /// Absolute violation (stretch for lines, penetration for ground).
    pub fn abs_error(&self) -> f32 {
        self.category.violation(self.current, self.target)
    }

    /// Violation relative to the target length.
    ///
    /// Ground targets are heights and may be zero; their relative error is
    /// taken against one meter.
    pub fn rel_error(&self) -> f32 {
        let scale = match self.category {
            ConstraintCategory::Line => self.target.abs().max(EPSILON),
            ConstraintCategory::Ground => 1.0,
        };
        self.abs_error() / scale
    }
}

/// Error statistics over a set of constraint samples.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConvergenceReport {
    pub max_abs_error: f32,
    pub avg_abs_error: f32,
    pub max_rel_error: f32,
    pub avg_rel_error: f32,
    pub converged: bool,
    /// Name of the constraint with the largest absolute error.
    pub worst: Option<&'static str>,
}

impl ConvergenceReport {
    /// Computes error statistics. An empty sample set is trivially converged.
    pub fn evaluate(samples: &[ConstraintSample], tolerance: f32) -> Self {
        if samples.is_empty() {
            return Self {
                converged: true,
                ..Self::default()
            };
        }

        let mut report = Self::default();
        let mut worst_err = -1.0_f32;
        let mut sum_abs = 0.0_f32;
        let mut sum_rel = 0.0_f32;

        for sample in samples {
            let abs = sample.abs_error();
            let rel = sample.rel_error();
            sum_abs += abs;
            sum_rel += rel;
            report.max_rel_error = report.max_rel_error.max(rel);
            if abs > worst_err {
                worst_err = abs;
                report.worst = Some(sample.name);
            }
        }

        let n = samples.len() as f32;
        report.max_abs_error = worst_err.max(0.0);
        report.avg_abs_error = sum_abs / n;
        report.avg_rel_error = sum_rel / n;
        report.converged = report.max_abs_error < tolerance;
        report
    }
}

/// Rate limiter keyed on simulated time.
#[derive(Debug, Clone)]
pub struct SummaryThrottle {
    interval: f64,
    last: Option<f64>,
}

impl SummaryThrottle {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns true at most once per interval of simulated time.
    pub fn ready(&mut self, sim_time: f64) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => sim_time - last >= self.interval,
        };
        if due {
            self.last = Some(sim_time);
        }
        due
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Everything the diagnostics look at for one step.
#[derive(Debug, Clone)]
pub struct StepObservation<'a> {
    pub timestep: u32,
    pub sim_time: f64,
    /// Constraint lengths after correction.
    pub samples: &'a [ConstraintSample],
    /// Max residual after each projection pass.
    pub iteration_residuals: &'a [f32],
    pub kite_position: Vec3,
    /// Midpoint of the two handles.
    pub anchor: Vec3,
    /// Nominal line length.
    pub nominal_length: f32,
    pub speed: f32,
    /// Left/right line tension (N).
    pub tension: [f32; 2],
    pub kinetic_energy: f64,
    pub potential_energy: f64,
}

/// Rolling constraint diagnostics.
pub struct ConstraintDiagnostics {
    config: DiagnosticsConfig,
    history: VecDeque<f32>,
    throttle: SummaryThrottle,
    last_report: Option<ConvergenceReport>,
    diverging: bool,
    outside_envelope: bool,
}

impl ConstraintDiagnostics {
    pub fn new(config: DiagnosticsConfig) -> Self {
        let capacity = config.history_len.max(3);
        Self {
            throttle: SummaryThrottle::new(config.summary_interval),
            history: VecDeque::with_capacity(capacity),
            config,
            last_report: None,
            diverging: false,
            outside_envelope: false,
        }
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    /// Computes statistics for `samples` with the configured tolerance.
    pub fn evaluate(&self, samples: &[ConstraintSample]) -> ConvergenceReport {
        ConvergenceReport::evaluate(samples, self.config.tolerance)
    }

    /// Appends a residual to the rolling history.
    ///
    /// Returns true if the last three records are strictly increasing and
    /// the latest exceeds tolerance.
    pub fn record_residual(&mut self, residual: f32) -> bool {
        let capacity = self.config.history_len.max(3);
        while self.history.len() >= capacity {
            self.history.pop_front();
        }
        self.history.push_back(residual);
        self.is_diverging()
    }

    /// Divergence check over the current history.
    pub fn is_diverging(&self) -> bool {
        let n = self.history.len();
        if n < 3 {
            return false;
        }
        let (a, b, c) = (self.history[n - 3], self.history[n - 2], self.history[n - 1]);
        a < b && b < c && c > self.config.tolerance
    }

    /// Residual history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = f32> + '_ {
        self.history.iter().copied()
    }

    /// Most recent step report.
    pub fn last_report(&self) -> Option<&ConvergenceReport> {
        self.last_report.as_ref()
    }

    /// Distance beyond the envelope, if the kite is outside it.
    pub fn envelope_excess(&self, distance: f32, nominal_length: f32) -> Option<f32> {
        let limit = nominal_length * (1.0 + self.config.envelope_margin);
        (distance > limit).then_some(distance - limit)
    }

    /// Observes one completed step and emits the resulting events.
    pub fn observe(&mut self, obs: &StepObservation<'_>, bus: &EventBus) -> ConvergenceReport {
        let report = self.evaluate(obs.samples);

        let mut diverging = false;
        for (iteration, &residual) in obs.iteration_residuals.iter().enumerate() {
            diverging |= self.record_residual(residual);
            if self.config.emit_iterations {
                bus.emit(SimulationEvent::new(
                    obs.timestep,
                    EventKind::SolverIteration {
                        iteration: iteration as u32,
                        residual,
                    },
                ));
            }
        }
        if obs.iteration_residuals.is_empty() {
            diverging = self.record_residual(report.max_abs_error);
        }

        bus.emit(SimulationEvent::new(
            obs.timestep,
            EventKind::Convergence {
                iterations: obs.iteration_residuals.len() as u32,
                final_residual: report.max_abs_error,
                converged: report.converged,
            },
        ));

        // Elevated notices fire on entering the bad state, not every frame.
        if diverging && !self.diverging {
            let recent_errors: Vec<f32> = self.history.iter().rev().take(3).rev().copied().collect();
            tracing::warn!(
                timestep = obs.timestep,
                errors = ?recent_errors,
                "constraint error diverging"
            );
            bus.emit(SimulationEvent::new(obs.timestep, EventKind::Divergence { recent_errors }));
        }
        self.diverging = diverging;

        let distance = obs.kite_position.distance(obs.anchor);
        let outside = self.envelope_excess(distance, obs.nominal_length).is_some();
        if outside && !self.outside_envelope {
            tracing::warn!(
                timestep = obs.timestep,
                distance,
                nominal = obs.nominal_length,
                "kite left flight envelope"
            );
            bus.emit(SimulationEvent::new(
                obs.timestep,
                EventKind::EnvelopeExceeded {
                    distance,
                    nominal: obs.nominal_length,
                },
            ));
        }
        self.outside_envelope = outside;

        if self.throttle.ready(obs.sim_time) {
            let p = obs.kite_position;
            tracing::info!(
                sim_time = obs.sim_time,
                x = p.x,
                y = p.y,
                z = p.z,
                speed = obs.speed,
                max_error = report.max_abs_error,
                worst = report.worst.unwrap_or("-"),
                tension_left = obs.tension[0],
                tension_right = obs.tension[1],
                "kite state"
            );
            bus.emit(SimulationEvent::new(
                obs.timestep,
                EventKind::Summary {
                    sim_time: obs.sim_time,
                    position: p.to_array(),
                    speed: obs.speed,
                    max_error: report.max_abs_error,
                    tension: obs.tension,
                },
            ));
            bus.emit(SimulationEvent::new(
                obs.timestep,
                EventKind::Energy {
                    kinetic: obs.kinetic_energy,
                    potential: obs.potential_energy,
                },
            ));
        }

        self.last_report = Some(report);
        report
    }

    /// Clears history, throttle and latched notices.
    pub fn reset(&mut self) {
        self.history.clear();
        self.throttle.reset();
        self.last_report = None;
        self.diverging = false;
        self.outside_envelope = false;
    }
}
