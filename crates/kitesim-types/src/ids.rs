//! Strongly-typed identifiers for kite geometry and constraints.
//!
//! Fixed enums replace string-keyed point lookups: the kite has exactly
//! the points listed here, and array-backed storage indexes them directly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named point in the kite's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KitePoint {
    /// Top of the spine; shared bridle anchor.
    Nose,
    /// Bottom of the spine.
    SpineBase,
    /// Left wing tip.
    LeftTip,
    /// Right wing tip.
    RightTip,
    /// Intermediate bridle anchor on the left leading edge.
    InterLeft,
    /// Intermediate bridle anchor on the right leading edge.
    InterRight,
    /// Centre bridle anchor on the spine; shared by both sides.
    Centre,
    /// Derived left control point (left line attachment).
    ControlLeft,
    /// Derived right control point (right line attachment).
    ControlRight,
}

impl KitePoint {
    /// Number of named points.
    pub const COUNT: usize = 9;

    /// All points in storage order.
    pub const ALL: [KitePoint; Self::COUNT] = [
        KitePoint::Nose,
        KitePoint::SpineBase,
        KitePoint::LeftTip,
        KitePoint::RightTip,
        KitePoint::InterLeft,
        KitePoint::InterRight,
        KitePoint::Centre,
        KitePoint::ControlLeft,
        KitePoint::ControlRight,
    ];

    /// Structural points that can touch the ground. Control points float
    /// in front of the sail and are excluded.
    pub const HULL: [KitePoint; 7] = [
        KitePoint::Nose,
        KitePoint::SpineBase,
        KitePoint::LeftTip,
        KitePoint::RightTip,
        KitePoint::InterLeft,
        KitePoint::InterRight,
        KitePoint::Centre,
    ];

    /// Returns the storage index.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns a stable snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            KitePoint::Nose => "nose",
            KitePoint::SpineBase => "spine_base",
            KitePoint::LeftTip => "left_tip",
            KitePoint::RightTip => "right_tip",
            KitePoint::InterLeft => "inter_left",
            KitePoint::InterRight => "inter_right",
            KitePoint::Centre => "centre",
            KitePoint::ControlLeft => "control_left",
            KitePoint::ControlRight => "control_right",
        }
    }

    /// Control point attached to the given side's line.
    pub fn control(side: Side) -> Self {
        match side {
            Side::Left => KitePoint::ControlLeft,
            Side::Right => KitePoint::ControlRight,
        }
    }

    /// Intermediate bridle anchor on the given side.
    pub fn inter(side: Side) -> Self {
        match side {
            Side::Left => KitePoint::InterLeft,
            Side::Right => KitePoint::InterRight,
        }
    }

    /// Returns true for the derived control points.
    pub fn is_control(self) -> bool {
        matches!(self, KitePoint::ControlLeft | KitePoint::ControlRight)
    }
}

impl fmt::Display for KitePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Left or right, as seen from the pilot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, left first.
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// Index into two-element per-side arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    /// Returns a stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    /// The other side.
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Constraint family.
///
/// Line constraints are maximum-distance (a line never pushes). The ground
/// constraint is a one-sided height limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintCategory {
    Line,
    Ground,
}

impl ConstraintCategory {
    /// Signed violation of a constraint, clamped to the violating side.
    ///
    /// For lines `current` is the length and only stretch counts. For the
    /// ground `current` is the height of the lowest point and only
    /// penetration below `target` counts.
    pub fn violation(self, current: f32, target: f32) -> f32 {
        match self {
            ConstraintCategory::Line => (current - target).max(0.0),
            ConstraintCategory::Ground => (target - current).max(0.0),
        }
    }
}
