//! Integration tests for kitesim-solver components.

use kitesim_math::{Quat, Vec3};
use kitesim_solver::config::{
    BridleConfig, GeometryConfig, IntegratorConfig, KiteConfig, SolverConfig, TensionConfig,
};
use kitesim_solver::constraints::{Constraint, ConstraintSet, HandlePositions};
use kitesim_solver::controller::{KiteController, StepContext};
use kitesim_solver::geometry::{BridleLengths, KiteGeometry};
use kitesim_solver::pbd::{ConstraintSolver, PositionBasedSolver, SolveReport, UnconstrainedSolver};
use kitesim_solver::state::{MassProperties, Pose, RigidBodyState};
use kitesim_solver::tension::{
    asymmetry_percent, compute_tension, dominant_side, rebalance_bridles, tension_vector,
    BridleTension, DominantSide, SideTension, TensionModel, TensionMonitor, TensionSample,
};
use kitesim_telemetry::{EventBus, EventKind, VecSink};
use kitesim_types::{ConstraintCategory, KiteError, KitePoint, Side};

const LINE: f32 = 15.0;

fn geometry() -> KiteGeometry {
    KiteGeometry::from_config(&GeometryConfig::default(), &BridleConfig::default()).unwrap()
}

fn high_handles() -> HandlePositions {
    HandlePositions::new(Vec3::new(-0.2, 20.0, 0.0), Vec3::new(0.2, 20.0, 0.0))
}

/// Pose placing both control points `drop` meters below the handles.
fn hanging_pose(geometry: &KiteGeometry, drop: f32) -> Pose {
    let c = geometry.control_point(Side::Left);
    Pose::new(Vec3::new(0.0, 20.0 - drop - c.y, -c.z), Quat::IDENTITY)
}

fn mass() -> MassProperties {
    MassProperties {
        mass: 0.31,
        inertia: 0.053,
    }
}

fn solve(
    pose: &mut Pose,
    velocity: &mut Vec3,
    constraints: &ConstraintSet,
    config: &SolverConfig,
) -> SolveReport {
    PositionBasedSolver::new().solve(pose, velocity, constraints, &geometry(), mass(), config)
}

// ─── Geometry Tests ───────────────────────────────────────────

#[test]
fn control_points_reproduce_bridle_lengths() {
    let g = geometry();
    for side in Side::BOTH {
        assert!(g.bridle_residual(side) < 1e-5, "{side}: {}", g.bridle_residual(side));
    }
    let left = g.control_point(Side::Left);
    assert!((left.x + 0.121_428_57).abs() < 1e-5);
    assert!((left.y - 0.1).abs() < 1e-5);
    assert!((left.z - 0.534_092_8).abs() < 1e-5);
}

#[test]
fn control_points_sit_in_front_of_the_sail() {
    let g = geometry();
    let (l, r) = (g.control_point(Side::Left), g.control_point(Side::Right));
    assert!(l.z > 0.0 && r.z > 0.0);
    assert!((l.x + r.x).abs() < 1e-6, "mirror symmetric");
    assert!((l.y - r.y).abs() < 1e-6);
}

#[test]
fn infeasible_bridles_are_rejected() {
    let g = geometry();
    let err = g
        .derive_control_point(Side::Left, BridleLengths::new(0.1, 0.1, 0.1))
        .unwrap_err();
    assert!(matches!(err, KiteError::InfeasibleBridle { side: "left", .. }));

    let err = g
        .derive_control_point(Side::Right, BridleLengths::new(0.6, -0.2, 0.5))
        .unwrap_err();
    assert!(matches!(err, KiteError::InfeasibleBridle { .. }));
}

#[test]
fn with_bridles_is_pure() {
    let g = geometry();
    let before = g.clone();
    let tuned = g
        .with_bridles(Side::Left, BridleLengths::new(0.7, 0.62, 0.57))
        .unwrap();

    assert_eq!(g, before, "original untouched");
    assert_ne!(tuned.control_point(Side::Left), g.control_point(Side::Left));
    assert_eq!(tuned.control_point(Side::Right), g.control_point(Side::Right));
    assert!(tuned.bridle_residual(Side::Left) < 1e-5);
    assert_eq!(tuned.bridles(Side::Left), BridleLengths::new(0.7, 0.62, 0.57));
}

#[test]
fn lowest_hull_point_ignores_control_points() {
    let g = geometry();
    let pose = Pose::new(Vec3::new(0.0, 2.0, 0.0), Quat::IDENTITY);
    let (point, world) = g.lowest_hull_point(&pose);
    assert_eq!(point, KitePoint::SpineBase);
    assert!((world.y - 1.75).abs() < 1e-6);

    // Upside down: the nose is lowest.
    let flipped = Pose::new(Vec3::new(0.0, 2.0, 0.0), Quat::from_rotation_z(std::f32::consts::PI));
    let (point, _) = g.lowest_hull_point(&flipped);
    assert_eq!(point, KitePoint::Nose);
}

// ─── Constraint Set Tests ─────────────────────────────────────

#[test]
fn constraint_set_order_and_samples() {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), LINE, 0.0);
    let kinds: Vec<ConstraintCategory> = set.iter().map(|c| c.category()).collect();
    assert_eq!(
        kinds,
        vec![ConstraintCategory::Line, ConstraintCategory::Line, ConstraintCategory::Ground]
    );

    let samples = set.samples(&hanging_pose(&g, 10.0), &g);
    let names: Vec<&str> = samples.iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["line_left", "line_right", "ground"]);
    // Slack lines and a kite well above ground carry no error.
    assert!(samples.iter().all(|s| s.abs_error() == 0.0));
}

#[test]
fn line_lengths_never_negative() {
    let mut set = ConstraintSet::new(high_handles(), -3.0, 0.0);
    assert_eq!(set.line_length(), 0.0);
    set.set_line_length(12.0);
    assert_eq!(set.line(Side::Right).target_length, 12.0);
    set.set_line_length(-1.0);
    assert_eq!(set.line(Side::Left).target_length, 0.0);
}

#[test]
fn ground_sample_reports_penetration() {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), 100.0, 0.0);
    let pose = Pose::new(Vec3::new(0.0, 0.05, 0.0), Quat::IDENTITY);
    let ground = set.iter().find(|c| matches!(c, Constraint::Ground(_))).unwrap();
    let sample = ground.sample(&pose, &g);
    assert!((sample.abs_error() - 0.2).abs() < 1e-5);
}

// ─── PBD Solver Tests ─────────────────────────────────────────

#[test]
fn residuals_decrease_for_outward_displacement() {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), LINE, 0.0);
    let mut pose = hanging_pose(&g, LINE + 0.6);
    let mut velocity = Vec3::ZERO;
    let report = solve(&mut pose, &mut velocity, &set, &SolverConfig::default());

    assert_eq!(report.iterations, 10);
    assert!(report.residuals[0] < 0.6);
    for pair in report.residuals.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-4, "residuals increased: {:?}", report.residuals);
    }
    assert!(report.final_residual() < 1e-3);
    assert!(report.converged);
    assert!(!report.rejected);

    for side in Side::BOTH {
        let m = report.line(side);
        assert!(m.pre_length > LINE + 0.5);
        assert!((m.post_length - LINE).abs() < 2e-3, "{side}: {}", m.post_length);
        assert!((set.line(side).length(&pose, &g) - m.post_length).abs() < 1e-4);
    }
}

#[test]
fn slack_lines_leave_pose_untouched() {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), LINE, 0.0);
    let start = hanging_pose(&g, 10.0);
    let mut pose = start;
    let mut velocity = Vec3::new(0.3, -1.0, 0.2);
    let report = solve(&mut pose, &mut velocity, &set, &SolverConfig::default());

    assert!((pose.position - start.position).length() < 1e-6);
    assert!(pose.orientation.angle_between(start.orientation) < 1e-6);
    assert_eq!(velocity, Vec3::new(0.3, -1.0, 0.2));
    assert!(report.residuals.iter().all(|&r| r == 0.0));
    assert!(report.lines.iter().all(|m| !m.taut));

    let mut model = TensionModel::new(TensionConfig::default());
    let tension = model.evaluate(&pose, &g, &set, Some(&report.lines), 1.0 / 60.0);
    assert_eq!(tension.line_tensions(), [0.0, 0.0]);
    assert_eq!(tension.asymmetry_percent, 0.0);
    assert_eq!(tension.dominant, DominantSide::Balanced);
}

#[test]
fn ground_projection_in_one_iteration() {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), 100.0, 0.0);
    // Spine base 0.3 m below ground.
    let mut pose = Pose::new(Vec3::new(0.0, -0.05, 0.0), Quat::IDENTITY);
    let mut velocity = Vec3::new(1.0, -2.0, 0.5);
    let config = SolverConfig {
        iterations: 1,
        ..Default::default()
    };
    let report = solve(&mut pose, &mut velocity, &set, &config);

    let (_, lowest) = g.lowest_hull_point(&pose);
    assert!(lowest.y >= -1e-6, "lowest hull point {}", lowest.y);
    assert!(report.ground_contact);
    assert!((report.penetration - 0.3).abs() < 1e-5);
    assert_eq!(velocity.y, 0.0);
    // Friction halves tangential velocity.
    assert!((velocity.x - 0.5).abs() < 1e-6);
    assert!((velocity.z - 0.25).abs() < 1e-6);
}

#[test]
fn ground_keeps_upward_velocity() {
    let set = ConstraintSet::new(high_handles(), 100.0, 0.0);
    let mut pose = Pose::new(Vec3::new(0.0, 0.1, 0.0), Quat::IDENTITY);
    let mut velocity = Vec3::new(0.0, 1.5, 0.0);
    solve(&mut pose, &mut velocity, &set, &SolverConfig::default());
    assert_eq!(velocity.y, 1.5);
}

#[test]
fn zero_length_lines_are_skipped() {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), 0.0, -100.0);
    let start = hanging_pose(&g, 10.0);
    let mut pose = start;
    let mut velocity = Vec3::ZERO;
    let report = solve(&mut pose, &mut velocity, &set, &SolverConfig::default());
    assert_eq!(pose.position, start.position);
    assert!(!report.rejected);
}

#[test]
fn non_finite_projection_is_rejected() {
    let g = geometry();
    let bad = HandlePositions::new(Vec3::splat(f32::NAN), Vec3::new(0.2, 20.0, 0.0));
    let set = ConstraintSet::new(bad, LINE, 0.0);
    let start = hanging_pose(&g, LINE + 1.0);
    let mut pose = start;
    let mut velocity = Vec3::new(0.0, -1.0, 0.0);
    let report = solve(&mut pose, &mut velocity, &set, &SolverConfig::default());

    assert!(report.rejected);
    assert!(!report.converged);
    assert_eq!(pose, start);
    assert_eq!(velocity, Vec3::new(0.0, -1.0, 0.0));
}

#[test]
fn taut_line_removes_outward_velocity() {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), LINE, 0.0);
    let mut pose = hanging_pose(&g, LINE + 0.01);
    let mut velocity = Vec3::new(0.0, -3.0, 0.0);
    let report = solve(&mut pose, &mut velocity, &set, &SolverConfig::default());

    assert!(report.lines.iter().any(|m| m.taut));
    assert!(velocity.y.abs() < 0.05, "outward velocity left: {velocity:?}");
}

#[test]
fn early_exit_stops_iterating() {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), LINE, 0.0);
    let mut pose = hanging_pose(&g, LINE + 0.6);
    let mut velocity = Vec3::ZERO;
    let config = SolverConfig {
        early_exit: true,
        ..SolverConfig::high_quality()
    };
    let report = solve(&mut pose, &mut velocity, &set, &config);
    assert!(report.iterations < config.iterations);
    assert!(report.converged);
}

#[test]
fn unconstrained_solver_is_a_no_op() {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), LINE, 0.0);
    let start = hanging_pose(&g, LINE + 2.0);
    let mut pose = start;
    let mut velocity = Vec3::new(0.0, -4.0, 0.0);
    let mut solver = UnconstrainedSolver;
    let report = solver.solve(&mut pose, &mut velocity, &set, &g, mass(), &SolverConfig::default());

    assert_eq!(pose, start);
    assert_eq!(velocity, Vec3::new(0.0, -4.0, 0.0));
    assert_eq!(report.iterations, 0);
    assert!(!report.converged);
    assert!(report.lines.iter().all(|m| m.constraint_force(1.0 / 60.0).is_none()));
    assert_eq!(solver.name(), "unconstrained");
}

#[test]
fn symmetric_stretch_is_projected_symmetrically() {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), LINE, 0.0);
    let mut pose = hanging_pose(&g, LINE + 0.6);
    let mut velocity = Vec3::new(0.0, -3.0, 0.0);
    let report = solve(&mut pose, &mut velocity, &set, &SolverConfig::default());

    let [left, right] = report.lines.map(|m| m.lambda.unwrap());
    assert!(left > 0.0);
    assert!((left - right).abs() <= 1e-4 * left, "left {left}, right {right}");
    assert!(pose.position.x.abs() < 1e-5, "drifted sideways: {}", pose.position.x);
    assert!(velocity.x.abs() < 1e-5, "sideways velocity: {}", velocity.x);
    let lengths = report.lines.map(|m| m.post_length);
    assert!((lengths[0] - lengths[1]).abs() < 1e-5, "{lengths:?}");
}

#[test]
fn single_line_projection_lands_on_sphere() {
    let g = geometry();
    let c = 0.5;
    let mut pose = hanging_pose(&g, LINE + 0.1);
    let left_handle = Vec3::new(-0.2, 20.0, 0.0);
    // Right handle sits on its control point, so only the left line is stretched.
    let right_handle = pose.transform_point(g.control_point(Side::Right));
    let set = ConstraintSet::new(HandlePositions::new(left_handle, right_handle), LINE, 0.0);

    let r = g.control_point(Side::Left);
    let separation = pose.position + r - left_handle;
    let n = separation.normalize();
    let arm = r.cross(n);
    let m = mass();
    let lambda = (separation.length() - LINE) / (1.0 / m.mass + c * arm.length_squared() / m.inertia);
    let expected_angle = c * arm.length() * lambda / m.inertia;

    let mut velocity = Vec3::ZERO;
    let config = SolverConfig {
        iterations: 1,
        angular_coupling: c,
        ..Default::default()
    };
    let report = solve(&mut pose, &mut velocity, &set, &config);

    let left = report.line(Side::Left);
    assert!((left.post_length - LINE).abs() < 0.01, "post length {}", left.post_length);
    assert!((left.lambda.unwrap() - lambda).abs() < 1e-4 * lambda);
    let angle = pose.orientation.angle_between(Quat::IDENTITY);
    assert!((angle - expected_angle).abs() < 1e-3, "angle {angle}, expected {expected_angle}");
    assert_eq!(report.line(Side::Right).lambda, Some(0.0));
}

#[test]
fn constraint_force_is_multiplier_over_dt_squared() {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), LINE, 0.0);
    let mut pose = hanging_pose(&g, LINE + 0.05);
    let mut velocity = Vec3::ZERO;
    let report = solve(&mut pose, &mut velocity, &set, &SolverConfig::default());

    let m = report.line(Side::Left);
    let lambda = m.lambda.unwrap();
    let dt = 1.0 / 60.0;
    let force = m.constraint_force(dt).unwrap();
    assert!((force - lambda / (dt * dt)).abs() < 1e-3 * force);
    assert!(m.constraint_force(0.0).is_none());
    assert!(m.constraint_force(f32::NAN).is_none());
}

// ─── Tension Tests ────────────────────────────────────────────

#[test]
fn tension_is_clamped_hookean() {
    assert_eq!(compute_tension(14.0, 15.0, 500.0, 800.0), 0.0);
    assert!((compute_tension(15.1, 15.0, 500.0, 800.0) - 50.0).abs() < 1e-2);
    assert_eq!(compute_tension(20.0, 15.0, 500.0, 800.0), 800.0);
    assert_eq!(compute_tension(f32::NAN, 15.0, 500.0, 800.0), 0.0);
}

#[test]
fn tension_points_toward_anchor() {
    let v = tension_vector(Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0), 40.0);
    assert!((v - Vec3::new(0.0, 40.0, 0.0)).length() < 1e-5);
    assert_eq!(tension_vector(Vec3::ONE, Vec3::ONE, 40.0), Vec3::ZERO);

    let s = TensionSample::measure(15.2, 15.0, Vec3::ZERO, Vec3::X * 15.2, 500.0, 800.0);
    assert!((s.deviation - 0.2).abs() < 1e-5);
    assert!((s.force() - Vec3::new(s.magnitude, 0.0, 0.0)).length() < 1e-4);
}

#[test]
fn asymmetry_and_dominant_side() {
    assert!((asymmetry_percent(30.0, 10.0) - 50.0).abs() < 1e-4);
    assert_eq!(asymmetry_percent(0.0, 0.0), 0.0);
    assert_eq!(dominant_side(30.0, 10.0, 10.0), DominantSide::Left);
    assert_eq!(dominant_side(1.0, 5.0, 10.0), DominantSide::Right);
    assert_eq!(dominant_side(10.0, 10.5, 10.0), DominantSide::Balanced);
    assert_eq!(dominant_side(0.0, 0.0, 10.0), DominantSide::Balanced);
}

#[test]
fn monitor_reports_rates() {
    let mut monitor = TensionMonitor::new();
    let first = monitor.update([10.0, 10.0], 0.1);
    assert_eq!(first.left, 0.0);
    let next = monitor.update([12.0, 9.0], 0.1);
    assert!((next.left - 20.0).abs() < 1e-3);
    assert!((next.right + 10.0).abs() < 1e-3);
    assert!((next.total - 10.0).abs() < 1e-3);

    monitor.reset();
    assert_eq!(monitor.update([50.0, 0.0], 0.1).left, 0.0);
}

fn side_with(line: f32, bridles: [f32; 3]) -> SideTension {
    let sample = |magnitude: f32, direction: Vec3| TensionSample {
        current_length: 1.0,
        target_length: 1.0,
        deviation: 0.0,
        magnitude,
        direction,
    };
    SideTension {
        side: Side::Left,
        line: sample(line, Vec3::Y),
        bridles: [
            BridleTension {
                anchor: KitePoint::Nose,
                sample: sample(bridles[0], Vec3::new(0.0, 0.6, -0.8)),
            },
            BridleTension {
                anchor: KitePoint::InterLeft,
                sample: sample(bridles[1], Vec3::new(-0.8, -0.6, 0.0)),
            },
            BridleTension {
                anchor: KitePoint::Centre,
                sample: sample(bridles[2], Vec3::new(0.0, -0.6, -0.8)),
            },
        ],
        rebalanced: false,
    }
}

#[test]
fn bridles_rescaled_to_line_tension() {
    let mut side = side_with(60.0, [10.0, 10.0, 20.0]);
    assert!(rebalance_bridles(&mut side, 0.1));
    assert!((side.bridle_sum() - 60.0).abs() < 1e-3);
    assert!((side.bridles[2].sample.magnitude - 30.0).abs() < 1e-3);
    assert!(side.rebalanced);

    let mut within_band = side_with(60.0, [20.0, 20.0, 22.0]);
    assert!(!rebalance_bridles(&mut within_band, 0.1));
    assert!((within_band.bridle_sum() - 62.0).abs() < 1e-4);
}

#[test]
fn rigid_bridles_share_line_load_geometrically() {
    let mut side = side_with(50.0, [0.0, 0.0, 0.0]);
    assert!(rebalance_bridles(&mut side, 0.1));
    // The nose bridle points along the line and takes nothing.
    assert_eq!(side.bridles[0].sample.magnitude, 0.0);
    assert!((side.bridles[1].sample.magnitude - 25.0).abs() < 1e-3);
    assert!((side.bridles[2].sample.magnitude - 25.0).abs() < 1e-3);
}

#[test]
fn model_conserves_bridle_load() {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), LINE, 0.0);
    let mut pose = hanging_pose(&g, LINE + 0.1);
    let mut velocity = Vec3::ZERO;
    let report = solve(&mut pose, &mut velocity, &set, &SolverConfig::default());

    let mut model = TensionModel::new(TensionConfig::default());
    let tension = model.evaluate(&pose, &g, &set, Some(&report.lines), 1.0 / 60.0);
    for side in Side::BOTH {
        let t = tension.side(side);
        assert!(t.line.magnitude > 15.0, "{side}: {}", t.line.magnitude);
        assert!(t.rebalanced);
        assert!((t.bridle_sum() - t.line.magnitude).abs() < 1e-2);
        assert!(t.bridles.iter().all(|b| b.sample.magnitude >= 0.0));
        assert!(t.line.direction.y > 0.99);
    }
    assert!(tension.asymmetry_percent < 1.0);
}

// ─── Controller Tests ─────────────────────────────────────────

fn free_controller(integrator: IntegratorConfig, velocity: Vec3) -> KiteController {
    let mut state = RigidBodyState::at_rest(
        Pose::new(Vec3::new(0.0, 50.0, 0.0), Quat::IDENTITY),
        0.31,
        0.053,
    );
    state.velocity = velocity;
    KiteController::new(state, integrator, SolverConfig::default(), Box::new(UnconstrainedSolver))
}

fn run_controller(controller: &mut KiteController, dt: f32, steps: u32, force: Vec3, torque: Vec3) {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), LINE, 0.0);
    let bus = EventBus::new();
    for timestep in 0..steps {
        let ctx = StepContext {
            constraints: &set,
            geometry: &g,
            bus: &bus,
            timestep,
        };
        controller.step(dt, force, torque, &ctx);
    }
}

#[test]
fn damping_is_frame_rate_independent() {
    let weightless = IntegratorConfig {
        gravity: [0.0, 0.0, 0.0],
        ..Default::default()
    };
    let mut fine = free_controller(weightless.clone(), Vec3::new(3.0, 0.0, 0.0));
    let mut coarse = free_controller(weightless, Vec3::new(3.0, 0.0, 0.0));
    run_controller(&mut fine, 1.0 / 60.0, 60, Vec3::ZERO, Vec3::ZERO);
    run_controller(&mut coarse, 1.0 / 30.0, 30, Vec3::ZERO, Vec3::ZERO);

    let expected = 3.0 * (-0.5_f32).exp();
    let (a, b) = (fine.state().velocity.x, coarse.state().velocity.x);
    assert!((a - expected).abs() < 1e-4, "1/60: {a}, expected {expected}");
    assert!((b - expected).abs() < 1e-4, "1/30: {b}, expected {expected}");
    assert!((a - b).abs() < 1e-4);
}

#[test]
fn falling_speed_is_frame_rate_independent() {
    let mut fine = free_controller(IntegratorConfig::default(), Vec3::ZERO);
    let mut coarse = free_controller(IntegratorConfig::default(), Vec3::ZERO);
    run_controller(&mut fine, 1.0 / 60.0, 60, Vec3::ZERO, Vec3::ZERO);
    run_controller(&mut coarse, 1.0 / 30.0, 30, Vec3::ZERO, Vec3::ZERO);

    let (a, b) = (fine.state().velocity.y, coarse.state().velocity.y);
    assert!(a < -7.0 && b < -7.0);
    assert!(((a - b) / a).abs() < 0.05, "1/60: {a}, 1/30: {b}");
}

#[test]
fn smoothed_force_starts_at_gravity() {
    let mut controller = free_controller(IntegratorConfig::default(), Vec3::ZERO);
    let weight = Vec3::new(0.0, -9.81 * 0.31, 0.0);
    assert!((controller.smoothed_force() - weight).length() < 1e-6);

    let dt = 1.0 / 60.0;
    run_controller(&mut controller, dt, 1, Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO);
    let blend = 1.0 - (-20.0_f32 * dt).exp();
    assert!((controller.smoothed_force().x - 10.0 * blend).abs() < 1e-4);
    assert!((controller.smoothed_force().y - weight.y).abs() < 1e-4);
}

#[test]
fn rejected_inputs_become_zero() {
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), LINE, 0.0);
    let sink = VecSink::new();
    let buffer = sink.buffer();
    let mut bus = EventBus::with_sink(Box::new(sink));
    let mut controller = free_controller(IntegratorConfig::default(), Vec3::ZERO);

    let ctx = StepContext {
        constraints: &set,
        geometry: &g,
        bus: &bus,
        timestep: 0,
    };
    let step = controller.step(1.0 / 60.0, Vec3::splat(f32::NAN), Vec3::new(0.0, 0.0, 1.0e6), &ctx);
    bus.flush();

    assert!(step.warnings.input_rejected);
    assert!(controller.state().is_finite());
    assert!(controller.smoothed_force().is_finite());
    assert_eq!(controller.smoothed_torque(), Vec3::ZERO);

    let events = buffer.lock().unwrap();
    let sources: Vec<String> = events
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::InputRejected { source, .. } => Some(source.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(sources, vec!["force".to_string(), "torque".to_string()]);
}

#[test]
fn velocity_is_clamped() {
    let config = IntegratorConfig {
        gravity: [0.0, 0.0, 0.0],
        max_velocity: 1.0,
        ..Default::default()
    };
    let mut controller = free_controller(config, Vec3::new(5.0, 0.0, 0.0));
    let g = geometry();
    let set = ConstraintSet::new(high_handles(), LINE, 0.0);
    let bus = EventBus::new();
    let ctx = StepContext {
        constraints: &set,
        geometry: &g,
        bus: &bus,
        timestep: 0,
    };
    let step = controller.step(1.0 / 60.0, Vec3::ZERO, Vec3::ZERO, &ctx);
    assert!(step.warnings.velocity);
    assert!(controller.state().speed() <= 1.0 + 1e-5);
    assert!(controller.warnings().any());
}

#[test]
fn torque_spins_and_orientation_stays_unit() {
    let mut controller = free_controller(IntegratorConfig::default(), Vec3::ZERO);
    run_controller(&mut controller, 1.0 / 60.0, 30, Vec3::ZERO, Vec3::new(0.0, 0.0, 0.5));
    let state = controller.state();
    assert!(state.angular_velocity.z > 0.0);
    assert!((state.orientation.length() - 1.0).abs() < 1e-5);
    assert!(state.orientation.angle_between(Quat::IDENTITY) > 0.1);
}

/// Writes a non-finite pose without flagging it.
struct PoisonSolver;

impl ConstraintSolver for PoisonSolver {
    fn solve(
        &mut self,
        pose: &mut Pose,
        velocity: &mut Vec3,
        constraints: &ConstraintSet,
        geometry: &KiteGeometry,
        mass: MassProperties,
        config: &SolverConfig,
    ) -> SolveReport {
        let report = UnconstrainedSolver.solve(pose, velocity, constraints, geometry, mass, config);
        pose.position = Vec3::new(f32::NAN, 0.0, 0.0);
        report
    }

    fn name(&self) -> &str {
        "poison"
    }
}

#[test]
fn non_finite_state_restores_last_valid_pose() {
    let start = Pose::new(Vec3::new(1.0, 8.0, -3.0), Quat::IDENTITY);
    let mut state = RigidBodyState::at_rest(start, 0.31, 0.053);
    state.velocity = Vec3::new(2.0, 0.0, 0.0);
    state.angular_velocity = Vec3::new(0.0, 1.0, 0.0);
    let mut controller = KiteController::new(
        state,
        IntegratorConfig::default(),
        SolverConfig::default(),
        Box::new(PoisonSolver),
    );

    let g = geometry();
    let set = ConstraintSet::new(high_handles(), LINE, 0.0);
    let sink = VecSink::new();
    let buffer = sink.buffer();
    let mut bus = EventBus::with_sink(Box::new(sink));
    let ctx = StepContext {
        constraints: &set,
        geometry: &g,
        bus: &bus,
        timestep: 7,
    };
    let step = controller.step(1.0 / 60.0, Vec3::ZERO, Vec3::ZERO, &ctx);
    bus.flush();

    assert!(step.warnings.recovered);
    let state = controller.state();
    assert_eq!(state.position, start.position);
    assert_eq!(state.velocity, Vec3::ZERO);
    assert_eq!(state.angular_velocity, Vec3::ZERO);
    assert!(state.is_finite());

    let events = buffer.lock().unwrap();
    assert!(events.iter().any(|e| e.timestep == 7
        && matches!(&e.kind, EventKind::StateRecovered { reason } if reason == "position")));
}

#[test]
fn reset_reseeds_gravity() {
    let mut controller = free_controller(IntegratorConfig::default(), Vec3::new(1.0, 2.0, 3.0));
    run_controller(&mut controller, 1.0 / 60.0, 30, Vec3::new(5.0, 5.0, 0.0), Vec3::Z);
    let home = Pose::new(Vec3::new(0.0, 5.0, 0.0), Quat::IDENTITY);
    controller.reset(home);

    assert_eq!(controller.state().pose(), home);
    assert_eq!(controller.state().velocity, Vec3::ZERO);
    assert_eq!(controller.state().angular_velocity, Vec3::ZERO);
    assert_eq!(controller.smoothed_torque(), Vec3::ZERO);
    assert_eq!(controller.smoothed_force(), Vec3::new(0.0, -9.81, 0.0) * 0.31);
}

// ─── Config Tests ─────────────────────────────────────────────

#[test]
fn default_config_is_valid() {
    KiteConfig::default().validate().unwrap();
    assert_eq!(SolverConfig::debug().iterations, 3);
    assert!(SolverConfig::high_quality().tolerance < SolverConfig::default().tolerance);
}

#[test]
fn invalid_config_values_are_rejected() {
    let mut config = KiteConfig::default();
    config.kite.mass = 0.0;
    assert!(matches!(config.validate(), Err(KiteError::InvalidConfig(_))));

    let mut config = KiteConfig::default();
    config.solver.iterations = 0;
    assert!(config.validate().is_err());

    let mut config = KiteConfig::default();
    config.initial.orientation = [0.0; 4];
    assert!(config.validate().is_err());

    let mut config = KiteConfig::default();
    config.lines.handle_left = [f32::NAN, 0.0, 0.0];
    assert!(config.validate().is_err());
}

#[test]
fn partial_config_fills_defaults() {
    let config: KiteConfig =
        serde_json::from_str(r#"{ "lines": { "length": 20.0 }, "solver": { "iterations": 4 } }"#)
            .unwrap();
    assert_eq!(config.lines.length, 20.0);
    assert_eq!(config.lines.handle_left, [-0.25, 1.2, 0.0]);
    assert_eq!(config.solver.iterations, 4);
    assert_eq!(config.kite.mass, 0.31);
}
