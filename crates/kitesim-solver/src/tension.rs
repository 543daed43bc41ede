//! Advisory tension read-model.
//!
//! Line tension is the force the solver had to apply to keep each line at
//! its rest length (`λ/dt²` from the projection), clamped like a Hookean
//! reading, so a static hang reports the same load at any frame rate.
//! Lines the solver did not project, and bridles, fall back to the
//! clamped Hookean law on their stretch. Nothing here feeds back into the
//! solver; the projected pose is ground truth and these numbers exist for
//! display and analysis.

use kitesim_math::Vec3;
use kitesim_types::constants::EPSILON;
use kitesim_types::{KitePoint, Side};
use serde::{Deserialize, Serialize};

use crate::config::TensionConfig;
use crate::constraints::ConstraintSet;
use crate::geometry::KiteGeometry;
use crate::pbd::LineMeasurement;
use crate::state::Pose;

/// Clamped Hookean tension magnitude.
///
/// `clamp(stiffness × (current − target), 0, max_tension)`. Slack is zero.
#[inline]
pub fn compute_tension(current: f32, target: f32, stiffness: f32, max_tension: f32) -> f32 {
    let deviation = current - target;
    if !(deviation > 0.0) {
        return 0.0;
    }
    (stiffness * deviation).clamp(0.0, max_tension.max(0.0))
}

/// Force vector of magnitude `magnitude` pulling `kite_point` toward `anchor`.
///
/// Zero when the two points coincide.
#[inline]
pub fn tension_vector(kite_point: Vec3, anchor: Vec3, magnitude: f32) -> Vec3 {
    direction(kite_point, anchor) * magnitude
}

fn direction(from: Vec3, to: Vec3) -> Vec3 {
    let d = to - from;
    let len = d.length();
    if len < EPSILON {
        Vec3::ZERO
    } else {
        d / len
    }
}

/// Tension in one line or bridle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TensionSample {
    pub current_length: f32,
    pub target_length: f32,
    /// current − target (negative when slack).
    pub deviation: f32,
    /// Tension magnitude (N).
    pub magnitude: f32,
    /// Unit vector from the kite point toward the anchor.
    pub direction: Vec3,
}

impl TensionSample {
    pub fn measure(
        current_length: f32,
        target_length: f32,
        kite_point: Vec3,
        anchor: Vec3,
        stiffness: f32,
        max_tension: f32,
    ) -> Self {
        Self {
            current_length,
            target_length,
            deviation: current_length - target_length,
            magnitude: compute_tension(current_length, target_length, stiffness, max_tension),
            direction: direction(kite_point, anchor),
        }
    }

    /// Sample with an externally measured magnitude, clamped to
    /// `[0, max_tension]`.
    pub fn with_magnitude(
        current_length: f32,
        target_length: f32,
        kite_point: Vec3,
        anchor: Vec3,
        magnitude: f32,
        max_tension: f32,
    ) -> Self {
        let magnitude = if magnitude.is_finite() {
            magnitude.clamp(0.0, max_tension.max(0.0))
        } else {
            0.0
        };
        Self {
            current_length,
            target_length,
            deviation: current_length - target_length,
            magnitude,
            direction: direction(kite_point, anchor),
        }
    }

    /// Force this sample exerts on the kite point.
    pub fn force(&self) -> Vec3 {
        self.direction * self.magnitude
    }

    pub fn is_slack(&self) -> bool {
        self.magnitude <= 0.0
    }
}

/// Tension in one bridle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BridleTension {
    pub anchor: KitePoint,
    pub sample: TensionSample,
}

/// Per-side aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideTension {
    pub side: Side,
    pub line: TensionSample,
    /// Nose, intermediate and centre bridles.
    pub bridles: [BridleTension; 3],
    /// Whether the conservation pass rewrote the bridle tensions.
    pub rebalanced: bool,
}

impl SideTension {
    pub fn bridle_sum(&self) -> f32 {
        self.bridles.iter().map(|b| b.sample.magnitude).sum()
    }
}

/// Which line carries noticeably more load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DominantSide {
    Left,
    Right,
    Balanced,
}

/// Rates of change since the previous frame (N/s).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TensionRates {
    pub left: f32,
    pub right: f32,
    pub total: f32,
}

/// Tension state for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensionReport {
    pub left: SideTension,
    pub right: SideTension,
    /// Left + right line tension (N).
    pub total: f32,
    /// |L − R| / (L + R) × 100; 0 when both lines are slack.
    pub asymmetry_percent: f32,
    pub dominant: DominantSide,
    pub rates: TensionRates,
}

impl TensionReport {
    pub fn side(&self, side: Side) -> &SideTension {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Left and right line tension (N).
    pub fn line_tensions(&self) -> [f32; 2] {
        [self.left.line.magnitude, self.right.line.magnitude]
    }
}

/// Asymmetry percentage of two line tensions.
pub fn asymmetry_percent(left: f32, right: f32) -> f32 {
    let total = left + right;
    if total < EPSILON {
        0.0
    } else {
        (left - right).abs() / total * 100.0
    }
}

/// Dominant side given an asymmetry threshold (percent).
pub fn dominant_side(left: f32, right: f32, threshold: f32) -> DominantSide {
    if asymmetry_percent(left, right) <= threshold {
        DominantSide::Balanced
    } else if left > right {
        DominantSide::Left
    } else {
        DominantSide::Right
    }
}

/// Bridle tension sums below this are numerical noise (N).
const BRIDLE_NOISE_FLOOR: f32 = 1.0e-2;

/// Rescales a side's bridle tensions so they sum to its line tension.
///
/// Sums within `band` (relative) of the line tension are left alone.
/// When the bridles carry no measurable stretch, the line load is split
/// by how directly each bridle opposes the line: weight `max(0, −u·l)`
/// with `u` toward the bridle anchor and `l` toward the handle, evenly
/// when no bridle opposes it. Returns true if the tensions were rewritten.
pub fn rebalance_bridles(side: &mut SideTension, band: f32) -> bool {
    let target = side.line.magnitude;
    let sum = side.bridle_sum();
    if (sum - target).abs() <= band * target {
        return false;
    }

    if sum > BRIDLE_NOISE_FLOOR {
        let scale = target / sum;
        for b in &mut side.bridles {
            b.sample.magnitude *= scale;
        }
    } else {
        let pull = side.line.direction;
        let mut weights = side.bridles.map(|b| (-b.sample.direction.dot(pull)).max(0.0));
        if weights.iter().sum::<f32>() < EPSILON {
            weights = [1.0; 3];
        }
        let total: f32 = weights.iter().sum();
        for (b, w) in side.bridles.iter_mut().zip(weights) {
            b.sample.magnitude = target * w / total;
        }
    }
    side.rebalanced = true;
    true
}

/// Remembers last frame's line tensions to report rates.
#[derive(Debug, Clone, Default)]
pub struct TensionMonitor {
    previous: Option<[f32; 2]>,
}

impl TensionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records this frame's tensions and returns the rate since the last one.
    ///
    /// The first frame after construction or reset reports zero rates.
    pub fn update(&mut self, tensions: [f32; 2], dt: f32) -> TensionRates {
        let rates = match self.previous {
            Some([l, r]) if dt > 0.0 => TensionRates {
                left: (tensions[0] - l) / dt,
                right: (tensions[1] - r) / dt,
                total: (tensions[0] + tensions[1] - l - r) / dt,
            },
            _ => TensionRates::default(),
        };
        self.previous = Some(tensions);
        rates
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// Computes [`TensionReport`]s from the pose and the last solve.
#[derive(Debug, Clone)]
pub struct TensionModel {
    config: TensionConfig,
    monitor: TensionMonitor,
}

impl TensionModel {
    pub fn new(config: TensionConfig) -> Self {
        Self {
            config,
            monitor: TensionMonitor::new(),
        }
    }

    pub fn config(&self) -> &TensionConfig {
        &self.config
    }

    /// Builds the report for `pose`.
    ///
    /// With `measurements` from a projected step, line tension is the
    /// constraint force `λ/dt²`. Unprojected measurements use the stretch
    /// at the tentative pose, and without measurements the lines are
    /// measured at `pose`.
    pub fn evaluate(
        &mut self,
        pose: &Pose,
        geometry: &KiteGeometry,
        constraints: &ConstraintSet,
        measurements: Option<&[LineMeasurement; 2]>,
        dt: f32,
    ) -> TensionReport {
        let [left, right] = Side::BOTH.map(|side| {
            let line = constraints.line(side);
            let (current, force) = match measurements {
                Some(m) => {
                    let m = &m[side.index()];
                    (m.pre_length, m.constraint_force(dt))
                }
                None => (line.length(pose, geometry), None),
            };
            let control = pose.transform_point(geometry.control_point(side));
            let line = match force {
                Some(f) => TensionSample::with_magnitude(
                    current,
                    line.target_length,
                    control,
                    line.anchor,
                    f,
                    self.config.max_line_tension,
                ),
                None => TensionSample::measure(
                    current,
                    line.target_length,
                    control,
                    line.anchor,
                    self.config.line_stiffness,
                    self.config.max_line_tension,
                ),
            };
            self.side_tension(side, pose, geometry, line)
        });

        let (l, r) = (left.line.magnitude, right.line.magnitude);
        let rates = self.monitor.update([l, r], dt);
        TensionReport {
            total: l + r,
            asymmetry_percent: asymmetry_percent(l, r),
            dominant: dominant_side(l, r, self.config.asymmetry_threshold),
            rates,
            left,
            right,
        }
    }

    fn side_tension(
        &self,
        side: Side,
        pose: &Pose,
        geometry: &KiteGeometry,
        line: TensionSample,
    ) -> SideTension {
        let cfg = &self.config;
        let control = pose.transform_point(geometry.control_point(side));

        let local_control = geometry.control_point(side);
        let bridles = geometry.bridle_anchors(side).map(|(anchor, rest)| {
            let length = local_control.distance(geometry.point(anchor));
            BridleTension {
                anchor,
                sample: TensionSample::measure(
                    length,
                    rest,
                    control,
                    pose.transform_point(geometry.point(anchor)),
                    cfg.bridle_stiffness,
                    cfg.max_bridle_tension,
                ),
            }
        });

        let mut tension = SideTension {
            side,
            line,
            bridles,
            rebalanced: false,
        };
        if cfg.conserve_bridles {
            rebalance_bridles(&mut tension, cfg.conservation_band);
        }
        tension
    }

    pub fn reset(&mut self) {
        self.monitor.reset();
    }
}
