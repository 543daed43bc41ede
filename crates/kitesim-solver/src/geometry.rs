//! Kite-frame geometry and bridle-derived control points.
//!
//! The six bridles are rigid at rest, so each side reduces to one control
//! point: the intersection of three spheres centred on the nose, the
//! side's intermediate anchor and the centre anchor. Derivation is pure;
//! callers commit the returned geometry explicitly.

use kitesim_math::{trilaterate_toward, Vec3};
use kitesim_types::{KiteError, KitePoint, KiteResult, Side};
use serde::{Deserialize, Serialize};

use crate::config::{BridleConfig, GeometryConfig};
use crate::state::Pose;

/// Largest bridle length mismatch accepted from a derivation (meters).
pub const BRIDLE_RESIDUAL_LIMIT: f32 = 1.0e-3;

/// Rest lengths of one side's three bridles (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridleLengths {
    pub nose: f32,
    pub inter: f32,
    pub centre: f32,
}

impl Default for BridleLengths {
    fn default() -> Self {
        Self {
            nose: 0.65,
            inter: 0.6,
            centre: 0.55,
        }
    }
}

impl BridleLengths {
    pub fn new(nose: f32, inter: f32, centre: f32) -> Self {
        Self { nose, inter, centre }
    }

    pub fn as_array(&self) -> [f32; 3] {
        [self.nose, self.inter, self.centre]
    }

    fn validate(&self, side: Side) -> KiteResult<()> {
        if self
            .as_array()
            .iter()
            .all(|l| l.is_finite() && *l > 0.0)
        {
            Ok(())
        } else {
            Err(KiteError::InfeasibleBridle {
                side: side.name(),
                reason: format!("bridle lengths must be positive and finite, got {self:?}"),
            })
        }
    }
}

/// Named kite-frame points plus the bridle lengths that produced the
/// control points.
#[derive(Debug, Clone, PartialEq)]
pub struct KiteGeometry {
    points: [Vec3; KitePoint::COUNT],
    bridles: [BridleLengths; 2],
}

impl KiteGeometry {
    /// Builds the geometry and derives both control points.
    pub fn from_config(geometry: &GeometryConfig, bridles: &BridleConfig) -> KiteResult<Self> {
        let mut points = [Vec3::ZERO; KitePoint::COUNT];
        let structural = [
            (KitePoint::Nose, geometry.nose),
            (KitePoint::SpineBase, geometry.spine_base),
            (KitePoint::LeftTip, geometry.left_tip),
            (KitePoint::RightTip, geometry.right_tip),
            (KitePoint::InterLeft, geometry.inter_left),
            (KitePoint::InterRight, geometry.inter_right),
            (KitePoint::Centre, geometry.centre),
        ];
        for (point, coords) in structural {
            let v = Vec3::from_array(coords);
            if !v.is_finite() {
                return Err(KiteError::InvalidGeometry(format!(
                    "{point} is not finite: {coords:?}"
                )));
            }
            points[point.index()] = v;
        }

        let base = Self {
            points,
            bridles: [bridles.left, bridles.right],
        };
        let left = base.derive_control_point(Side::Left, bridles.left)?;
        let right = base.derive_control_point(Side::Right, bridles.right)?;
        Ok(base.with_control_points([left, right], [bridles.left, bridles.right]))
    }

    /// Kite-frame position of a point.
    #[inline]
    pub fn point(&self, point: KitePoint) -> Vec3 {
        self.points[point.index()]
    }

    /// Kite-frame control point for a side.
    #[inline]
    pub fn control_point(&self, side: Side) -> Vec3 {
        self.point(KitePoint::control(side))
    }

    pub fn bridles(&self, side: Side) -> BridleLengths {
        self.bridles[side.index()]
    }

    /// Bridle anchors for a side paired with their rest lengths, in
    /// nose/inter/centre order.
    pub fn bridle_anchors(&self, side: Side) -> [(KitePoint, f32); 3] {
        let lengths = self.bridles(side);
        [
            (KitePoint::Nose, lengths.nose),
            (KitePoint::inter(side), lengths.inter),
            (KitePoint::Centre, lengths.centre),
        ]
    }

    /// Solves for a side's control point without touching `self`.
    ///
    /// The root in front of the sail (+Z, toward the pilot) is chosen.
    /// Lengths whose spheres do not meet are rejected once the flattened
    /// solution misses any bridle length by more than
    /// [`BRIDLE_RESIDUAL_LIMIT`].
    pub fn derive_control_point(&self, side: Side, lengths: BridleLengths) -> KiteResult<Vec3> {
        lengths.validate(side)?;
        let anchors = [
            self.point(KitePoint::Nose),
            self.point(KitePoint::inter(side)),
            self.point(KitePoint::Centre),
        ];
        let solution = trilaterate_toward(anchors, lengths.as_array(), Vec3::Z).map_err(|e| {
            KiteError::InfeasibleBridle {
                side: side.name(),
                reason: e.to_string(),
            }
        })?;

        let point = solution.point.as_vec3();
        let residual = anchors
            .iter()
            .zip(lengths.as_array())
            .map(|(a, l)| (point.distance(*a) - l).abs())
            .fold(0.0_f32, f32::max);
        if residual > BRIDLE_RESIDUAL_LIMIT {
            return Err(KiteError::InfeasibleBridle {
                side: side.name(),
                reason: format!(
                    "bridle spheres do not intersect (residual {residual:.4} m, radicand {:.3e})",
                    solution.radicand
                ),
            });
        }
        Ok(point)
    }

    /// Returns a copy with one side's bridles replaced and its control
    /// point re-derived. `self` is untouched on error.
    pub fn with_bridles(&self, side: Side, lengths: BridleLengths) -> KiteResult<Self> {
        let control = self.derive_control_point(side, lengths)?;
        let mut controls = [self.control_point(Side::Left), self.control_point(Side::Right)];
        let mut bridles = self.bridles;
        controls[side.index()] = control;
        bridles[side.index()] = lengths;
        Ok(self.with_control_points(controls, bridles))
    }

    /// Returns a copy with the given control points and bridle lengths.
    pub fn with_control_points(&self, controls: [Vec3; 2], bridles: [BridleLengths; 2]) -> Self {
        let mut next = self.clone();
        next.points[KitePoint::ControlLeft.index()] = controls[0];
        next.points[KitePoint::ControlRight.index()] = controls[1];
        next.bridles = bridles;
        next
    }

    /// Largest mismatch between a side's bridle lengths and the actual
    /// control-point-to-anchor distances (meters).
    pub fn bridle_residual(&self, side: Side) -> f32 {
        let control = self.control_point(side);
        self.bridle_anchors(side)
            .iter()
            .map(|(anchor, length)| (control.distance(self.point(*anchor)) - length).abs())
            .fold(0.0, f32::max)
    }

    /// Lowest hull point of the kite in world space.
    pub fn lowest_hull_point(&self, pose: &Pose) -> (KitePoint, Vec3) {
        let mut lowest = (KitePoint::HULL[0], pose.transform_point(self.point(KitePoint::HULL[0])));
        for &point in &KitePoint::HULL[1..] {
            let world = pose.transform_point(self.point(point));
            if world.y < lowest.1.y {
                lowest = (point, world);
            }
        }
        lowest
    }

    /// World-space position of every named point.
    pub fn world_points(&self, pose: &Pose) -> [(KitePoint, Vec3); KitePoint::COUNT] {
        KitePoint::ALL.map(|p| (p, pose.transform_point(self.point(p))))
    }
}
