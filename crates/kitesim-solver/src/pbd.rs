//! Position-based constraint projection.
//!
//! Lines are inextensible but never push. A taut line moves the whole
//! rigid body: a translation plus a rotation weighted by the generalized
//! inverse mass `w = 1/m + c·|r×n|²/I`, so the attachment point moves back
//! onto the tether sphere to first order. When both lines are taut they
//! are projected together from the same pose through their 2×2 coupling
//! matrix, so neither side is corrected first. The ground plane follows
//! in the same iteration.

use kitesim_math::{Quat, Vec3};
use kitesim_types::constants::EPSILON;
use kitesim_types::Side;

use crate::config::SolverConfig;
use crate::constraints::{ConstraintSet, LineConstraint};
use crate::geometry::KiteGeometry;
use crate::state::{MassProperties, Pose};

/// Length of one line before and after projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMeasurement {
    pub side: Side,
    /// Length at the tentative (integrated, uncorrected) pose.
    pub pre_length: f32,
    /// Length after projection.
    pub post_length: f32,
    pub target_length: f32,
    /// Whether the line ended the solve at (or beyond) its rest length.
    pub taut: bool,
    /// Position multiplier accumulated over all passes (kg·m), or `None`
    /// when the line was not projected. `λ/dt²` is the mean line force
    /// over the step.
    pub lambda: Option<f32>,
}

impl LineMeasurement {
    /// Stretch the solver had to remove this step (0 when slack).
    pub fn pre_stretch(&self) -> f32 {
        (self.pre_length - self.target_length).max(0.0)
    }

    /// Mean force the line exerted over a step of length `dt` (N).
    ///
    /// `None` when the line was not projected or `dt` is unusable.
    pub fn constraint_force(&self, dt: f32) -> Option<f32> {
        let lambda = self.lambda?;
        if !(dt > 0.0) || !lambda.is_finite() {
            return None;
        }
        Some(lambda.max(0.0) / (dt * dt))
    }
}

/// Result of one projection.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    /// Passes executed.
    pub iterations: u32,
    /// Largest remaining violation after each pass (meters).
    pub residuals: Vec<f32>,
    /// Left and right line measurements.
    pub lines: [LineMeasurement; 2],
    /// Whether any hull point touched the ground.
    pub ground_contact: bool,
    /// Deepest penetration corrected (meters).
    pub penetration: f32,
    /// Final residual below tolerance.
    pub converged: bool,
    /// The projection produced non-finite values and was discarded.
    pub rejected: bool,
}

impl SolveReport {
    /// Residual after the last pass, or 0 if no pass ran.
    pub fn final_residual(&self) -> f32 {
        self.residuals.last().copied().unwrap_or(0.0)
    }

    pub fn line(&self, side: Side) -> &LineMeasurement {
        &self.lines[side.index()]
    }
}

/// Trait for constraint projection back-ends.
///
/// The controller calls `solve` once per step on the tentative pose:
///
/// ```text
/// pose = integrate(state, dt);
/// report = solver.solve(&mut pose, &mut velocity, constraints, geometry, mass, config);
/// ```
///
/// # Implementations
///
/// - [`PositionBasedSolver`]: coupled rigid-body projection
/// - [`UnconstrainedSolver`]: no-op, free flight
pub trait ConstraintSolver: Send {
    /// Projects `pose` onto the constraint set.
    ///
    /// `velocity` is adjusted only where a constraint forbids motion: the
    /// downward component on ground contact and the outward radial
    /// component along a taut line. On a rejected solve both are left
    /// untouched.
    fn solve(
        &mut self,
        pose: &mut Pose,
        velocity: &mut Vec3,
        constraints: &ConstraintSet,
        geometry: &KiteGeometry,
        mass: MassProperties,
        config: &SolverConfig,
    ) -> SolveReport;

    /// Returns the solver's name.
    fn name(&self) -> &str;
}

fn measure(
    line: &LineConstraint,
    pre: &Pose,
    post: &Pose,
    geometry: &KiteGeometry,
    taut_slop: f32,
    lambda: Option<f32>,
) -> LineMeasurement {
    let post_length = line.length(post, geometry);
    LineMeasurement {
        side: line.side,
        pre_length: line.length(pre, geometry),
        post_length,
        target_length: line.target_length,
        taut: line.target_length > 0.0 && post_length >= line.target_length - taut_slop,
        lambda,
    }
}

/// Largest line stretch or ground penetration at `pose`.
fn residual(pose: &Pose, constraints: &ConstraintSet, geometry: &KiteGeometry) -> f32 {
    let stretch = constraints
        .lines()
        .iter()
        .map(|l| (l.length(pose, geometry) - l.target_length).max(0.0))
        .fold(0.0, f32::max);
    stretch.max(constraints.ground().penetration(pose, geometry))
}

/// Relative determinant below which two lines count as one.
const COUPLING_EPSILON: f32 = 1.0e-4;

/// Linearization of one stretched line at the current pose.
#[derive(Debug, Clone, Copy)]
struct Stretch {
    violation: f32,
    /// Unit vector from the handle toward the attachment point.
    normal: Vec3,
    /// `r × n`, with `r` the attachment point relative to the center of mass.
    arm: Vec3,
}

impl Stretch {
    fn of(pose: &Pose, line: &LineConstraint, geometry: &KiteGeometry) -> Option<Self> {
        if line.target_length <= 0.0 {
            return None;
        }
        let r = pose.rotate(geometry.point(line.point));
        let separation = pose.position + r - line.anchor;
        let distance = separation.length();
        if distance < EPSILON {
            return None;
        }
        let violation = distance - line.target_length;
        if !(violation > 0.0) {
            return None;
        }
        let normal = separation / distance;
        Some(Self {
            violation,
            normal,
            arm: r.cross(normal),
        })
    }
}

/// Position-based projection of the whole rigid body.
#[derive(Debug, Default, Clone)]
pub struct PositionBasedSolver;

impl PositionBasedSolver {
    pub fn new() -> Self {
        Self
    }

    /// Moves `pose` so every stretched line returns to its tether sphere.
    /// Returns the multiplier applied to each line.
    fn project_lines(
        pose: &mut Pose,
        constraints: &ConstraintSet,
        geometry: &KiteGeometry,
        mass: MassProperties,
        config: &SolverConfig,
    ) -> [f32; 2] {
        let inv_mass = mass.inverse_mass();
        let inv_inertia = mass.inverse_inertia() * config.angular_coupling;
        // Point-to-point response: how far line `b`'s point moves along its
        // normal per unit multiplier on line `a`.
        let k = |a: &Stretch, b: &Stretch| {
            a.normal.dot(b.normal) * inv_mass + a.arm.dot(b.arm) * inv_inertia
        };

        let [left, right] = constraints.lines().map(|l| Stretch::of(pose, &l, geometry));
        let lambdas = match (left, right) {
            (Some(a), Some(b)) => {
                let (kaa, kbb, kab) = (k(&a, &a), k(&b, &b), k(&a, &b));
                let det = kaa * kbb - kab * kab;
                let alone = (a.violation / kaa, b.violation / kbb);
                if det > COUPLING_EPSILON * kaa * kbb {
                    let la = (a.violation * kbb - b.violation * kab) / det;
                    let lb = (b.violation * kaa - a.violation * kab) / det;
                    match (la >= 0.0, lb >= 0.0) {
                        (true, true) => [la, lb],
                        // A negative multiplier means that line would push:
                        // drop it and project the other alone.
                        (true, false) => [alone.0, 0.0],
                        (false, true) => [0.0, alone.1],
                        (false, false) if alone.0 >= alone.1 => [alone.0, 0.0],
                        (false, false) => [0.0, alone.1],
                    }
                } else {
                    // Parallel lines act as one; split the load.
                    [0.5 * alone.0, 0.5 * alone.1]
                }
            }
            (Some(a), None) => [a.violation / k(&a, &a), 0.0],
            (None, Some(b)) => [0.0, b.violation / k(&b, &b)],
            (None, None) => return [0.0; 2],
        };

        let mut translation = Vec3::ZERO;
        let mut rotation = Vec3::ZERO;
        for (stretch, lambda) in [left, right].iter().zip(lambdas) {
            if let Some(s) = stretch {
                translation -= s.normal * (lambda * inv_mass);
                rotation -= s.arm * (lambda * inv_inertia);
            }
        }

        pose.position += translation;
        let angle = rotation.length();
        if angle > config.max_correction_angle {
            rotation *= config.max_correction_angle / angle;
        }
        if angle > EPSILON {
            pose.orientation = (Quat::from_scaled_axis(rotation) * pose.orientation).normalize();
        }
        lambdas
    }
}

/// Removes the velocity component that would lengthen any taut line.
///
/// `normals` point from each handle toward its attachment point. Both
/// constraints are released together so the result does not depend on
/// which line is listed first.
fn remove_outward_velocity(v: Vec3, normals: &[Vec3]) -> Vec3 {
    match *normals {
        [n] => v - n * v.dot(n).max(0.0),
        [n0, n1] => {
            let (b0, b1) = (v.dot(n0), v.dot(n1));
            if b0 <= 0.0 && b1 <= 0.0 {
                return v;
            }
            let g = n0.dot(n1);
            let det = 1.0 - g * g;
            if det > COUPLING_EPSILON {
                let m0 = (b0 - g * b1) / det;
                let m1 = (b1 - g * b0) / det;
                if m0 >= 0.0 && m1 >= 0.0 {
                    return v - n0 * m0 - n1 * m1;
                }
                // Only one line binds.
                let (first, second) = if b0 >= b1 { (n0, n1) } else { (n1, n0) };
                let v = v - first * v.dot(first).max(0.0);
                v - second * v.dot(second).max(0.0)
            } else {
                let n = (n0 + n1).normalize_or_zero();
                v - n * v.dot(n).max(0.0)
            }
        }
        _ => v,
    }
}

impl ConstraintSolver for PositionBasedSolver {
    fn solve(
        &mut self,
        pose: &mut Pose,
        velocity: &mut Vec3,
        constraints: &ConstraintSet,
        geometry: &KiteGeometry,
        mass: MassProperties,
        config: &SolverConfig,
    ) -> SolveReport {
        let tentative = *pose;
        let mut work = *pose;
        let mut v = *velocity;
        let mut residuals = Vec::with_capacity(config.iterations as usize);
        let mut ground_contact = false;
        let mut penetration = 0.0_f32;
        let mut lambdas = [0.0_f32; 2];

        for _ in 0..config.iterations {
            let applied = Self::project_lines(&mut work, constraints, geometry, mass, config);
            lambdas[0] += applied[0];
            lambdas[1] += applied[1];

            let depth = constraints.ground().penetration(&work, geometry);
            if depth > 0.0 {
                work.position.y += depth;
                v.y = v.y.max(0.0);
                ground_contact = true;
                penetration = penetration.max(depth);
            }

            let r = residual(&work, constraints, geometry);
            residuals.push(r);
            if config.early_exit && r < config.tolerance {
                break;
            }
        }

        let lines = constraints.lines().map(|l| {
            let lambda = lambdas[l.side.index()];
            measure(&l, &tentative, &work, geometry, config.taut_slop, Some(lambda))
        });

        if !work.is_finite() || !v.is_finite() || residuals.iter().any(|r| !r.is_finite()) {
            tracing::warn!(
                iterations = residuals.len(),
                "constraint projection produced non-finite state; discarded"
            );
            return SolveReport {
                iterations: residuals.len() as u32,
                residuals,
                lines: constraints
                    .lines()
                    .map(|l| measure(&l, &tentative, &tentative, geometry, config.taut_slop, None)),
                ground_contact,
                penetration,
                converged: false,
                rejected: true,
            };
        }

        if ground_contact {
            let keep = 1.0 - config.ground_friction;
            v.x *= keep;
            v.z *= keep;
        }

        // A taut line cannot lengthen.
        let mut normals = Vec::with_capacity(2);
        for (line, m) in constraints.lines().iter().zip(&lines) {
            if !m.taut {
                continue;
            }
            let outward = work.transform_point(geometry.point(line.point)) - line.anchor;
            let length = outward.length();
            if length >= EPSILON {
                normals.push(outward / length);
            }
        }
        v = remove_outward_velocity(v, &normals);

        work.orientation = work.orientation.normalize();
        *pose = work;
        *velocity = v;

        let converged = residuals
            .last()
            .is_some_and(|r| *r < config.tolerance);
        SolveReport {
            iterations: residuals.len() as u32,
            residuals,
            lines,
            ground_contact,
            penetration,
            converged,
            rejected: false,
        }
    }

    fn name(&self) -> &str {
        "position_based"
    }
}

/// Leaves the pose untouched. Used for free-flight runs and as a
/// reference when isolating integrator behavior.
#[derive(Debug, Default, Clone)]
pub struct UnconstrainedSolver;

impl ConstraintSolver for UnconstrainedSolver {
    fn solve(
        &mut self,
        pose: &mut Pose,
        _velocity: &mut Vec3,
        constraints: &ConstraintSet,
        geometry: &KiteGeometry,
        _mass: MassProperties,
        config: &SolverConfig,
    ) -> SolveReport {
        let residual = residual(pose, constraints, geometry);
        SolveReport {
            iterations: 0,
            residuals: Vec::new(),
            lines: constraints
                .lines()
                .map(|l| measure(&l, pose, pose, geometry, config.taut_slop, None)),
            ground_contact: false,
            penetration: 0.0,
            converged: residual < config.tolerance,
            rejected: false,
        }
    }

    fn name(&self) -> &str {
        "unconstrained"
    }
}
