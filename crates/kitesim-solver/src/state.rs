//! Rigid-body state of the kite.
//!
//! This is the primary mutable data structure during simulation. The
//! controller integrates it, the constraint solver corrects its pose.

use kitesim_math::{Quat, Vec3};

/// Position and orientation of the kite's center of mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Transforms a kite-frame point to world space.
    #[inline]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * local
    }

    /// World-space offset of a kite-frame point from the center of mass.
    #[inline]
    pub fn rotate(&self, local: Vec3) -> Vec3 {
        self.orientation * local
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

/// Mass and isotropic inertia, with their inverses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    pub mass: f32,
    pub inertia: f32,
}

impl MassProperties {
    #[inline]
    pub fn inverse_mass(&self) -> f32 {
        1.0 / self.mass
    }

    #[inline]
    pub fn inverse_inertia(&self) -> f32 {
        1.0 / self.inertia
    }
}

/// Full kinematic state of the kite.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyState {
    pub position: Vec3,
    /// Unit quaternion; renormalized after every update.
    pub orientation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Mass (kg).
    pub mass: f32,
    /// Isotropic moment of inertia (kg·m²).
    pub inertia: f32,
}

impl RigidBodyState {
    /// Creates a body at rest in `pose`.
    pub fn at_rest(pose: Pose, mass: f32, inertia: f32) -> Self {
        Self {
            position: pose.position,
            orientation: pose.orientation.normalize(),
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass,
            inertia,
        }
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.orientation)
    }

    /// Replaces the pose, renormalizing the orientation.
    pub fn set_pose(&mut self, pose: Pose) {
        self.position = pose.position;
        self.orientation = pose.orientation.normalize();
    }

    pub fn mass_properties(&self) -> MassProperties {
        MassProperties {
            mass: self.mass,
            inertia: self.inertia,
        }
    }

    /// Zeroes linear and angular velocity.
    pub fn stop(&mut self) {
        self.velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.orientation.is_finite()
            && self.velocity.is_finite()
            && self.angular_velocity.is_finite()
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Translational + rotational kinetic energy (J).
    pub fn kinetic_energy(&self) -> f64 {
        let m = self.mass as f64;
        let i = self.inertia as f64;
        0.5 * m * self.velocity.length_squared() as f64
            + 0.5 * i * self.angular_velocity.length_squared() as f64
    }

    /// Gravitational potential energy relative to a ground height (J).
    pub fn potential_energy(&self, gravity: Vec3, ground_height: f32) -> f64 {
        let height = Vec3::new(0.0, self.position.y - ground_height, 0.0);
        -(self.mass as f64) * gravity.dot(height) as f64
    }
}
