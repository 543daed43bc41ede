//! Constraint set: two inextensible control lines and the ground plane.

use kitesim_debug::ConstraintSample;
use kitesim_math::Vec3;
use kitesim_types::{ConstraintCategory, KitePoint, Side};

use crate::geometry::KiteGeometry;
use crate::state::Pose;

/// World-space positions of the pilot's handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandlePositions {
    pub left: Vec3,
    pub right: Vec3,
}

impl HandlePositions {
    pub fn new(left: Vec3, right: Vec3) -> Self {
        Self { left, right }
    }

    #[inline]
    pub fn get(&self, side: Side) -> Vec3 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn midpoint(&self) -> Vec3 {
        (self.left + self.right) * 0.5
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite() && self.right.is_finite()
    }
}

/// A control line from a kite control point to a handle.
///
/// Lines resist stretching only; a slack line applies nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineConstraint {
    pub side: Side,
    pub point: KitePoint,
    pub anchor: Vec3,
    pub target_length: f32,
}

impl LineConstraint {
    /// Current world-space length for `pose`.
    pub fn length(&self, pose: &Pose, geometry: &KiteGeometry) -> f32 {
        pose.transform_point(geometry.point(self.point)).distance(self.anchor)
    }

    pub fn name(&self) -> &'static str {
        match self.side {
            Side::Left => "line_left",
            Side::Right => "line_right",
        }
    }
}

/// Horizontal ground plane that no hull point may go below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundConstraint {
    pub height: f32,
}

impl GroundConstraint {
    /// Penetration depth of the lowest hull point (0 when above ground).
    pub fn penetration(&self, pose: &Pose, geometry: &KiteGeometry) -> f32 {
        let (_, lowest) = geometry.lowest_hull_point(pose);
        (self.height - lowest.y).max(0.0)
    }
}

/// One entry of the constraint set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    Line(LineConstraint),
    Ground(GroundConstraint),
}

impl Constraint {
    pub fn category(&self) -> ConstraintCategory {
        match self {
            Constraint::Line(_) => ConstraintCategory::Line,
            Constraint::Ground(_) => ConstraintCategory::Ground,
        }
    }

    /// Diagnostic sample for this constraint at `pose`.
    ///
    /// Ground samples report the lowest hull point height against the
    /// plane height.
    pub fn sample(&self, pose: &Pose, geometry: &KiteGeometry) -> ConstraintSample {
        match self {
            Constraint::Line(line) => ConstraintSample::new(
                line.name(),
                line.length(pose, geometry),
                line.target_length,
                ConstraintCategory::Line,
            ),
            Constraint::Ground(ground) => {
                let (_, lowest) = geometry.lowest_hull_point(pose);
                ConstraintSample::new("ground", lowest.y, ground.height, ConstraintCategory::Ground)
            }
        }
    }
}

/// The fixed constraint set: left line, right line, ground. Projection
/// runs in this order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    lines: [LineConstraint; 2],
    ground: GroundConstraint,
}

impl ConstraintSet {
    pub fn new(handles: HandlePositions, line_length: f32, ground_height: f32) -> Self {
        let line = |side: Side| LineConstraint {
            side,
            point: KitePoint::control(side),
            anchor: handles.get(side),
            target_length: line_length.max(0.0),
        };
        Self {
            lines: [line(Side::Left), line(Side::Right)],
            ground: GroundConstraint {
                height: ground_height,
            },
        }
    }

    #[inline]
    pub fn line(&self, side: Side) -> &LineConstraint {
        &self.lines[side.index()]
    }

    pub fn lines(&self) -> &[LineConstraint; 2] {
        &self.lines
    }

    pub fn ground(&self) -> &GroundConstraint {
        &self.ground
    }

    pub fn handles(&self) -> HandlePositions {
        HandlePositions::new(self.lines[0].anchor, self.lines[1].anchor)
    }

    pub fn set_handles(&mut self, handles: HandlePositions) {
        for line in &mut self.lines {
            line.anchor = handles.get(line.side);
        }
    }

    /// Sets both lines' rest length. Negative lengths are stored as zero.
    pub fn set_line_length(&mut self, length: f32) {
        for line in &mut self.lines {
            line.target_length = length.max(0.0);
        }
    }

    pub fn line_length(&self) -> f32 {
        self.lines[0].target_length
    }

    /// Constraints in projection order.
    pub fn iter(&self) -> impl Iterator<Item = Constraint> + '_ {
        self.lines
            .iter()
            .map(|l| Constraint::Line(*l))
            .chain(std::iter::once(Constraint::Ground(self.ground)))
    }

    /// Diagnostic samples for every constraint at `pose`.
    pub fn samples(&self, pose: &Pose, geometry: &KiteGeometry) -> Vec<ConstraintSample> {
        self.iter().map(|c| c.sample(pose, geometry)).collect()
    }
}
