//! Small vector utilities shared by the integrator and the solver.

use glam::{Quat, Vec3};

/// Clamps the magnitude of `v` to `max`.
///
/// Returns the clamped vector and whether clamping happened. A non-positive
/// or non-finite `max` disables the clamp.
#[inline]
pub fn clamp_magnitude(v: Vec3, max: f32) -> (Vec3, bool) {
    if !(max > 0.0) || !max.is_finite() {
        return (v, false);
    }
    let len_sq = v.length_squared();
    if len_sq > max * max {
        (v * (max / len_sq.sqrt()), true)
    } else {
        (v, false)
    }
}

/// Validates an external input vector.
///
/// Returns `None` when `v` has non-finite components or its magnitude
/// exceeds `ceiling`.
#[inline]
pub fn sanitize(v: Vec3, ceiling: f32) -> Option<Vec3> {
    if !v.is_finite() {
        return None;
    }
    if ceiling > 0.0 && v.length_squared() > ceiling * ceiling {
        return None;
    }
    Some(v)
}

/// Applies an incremental rotation `|ω|·dt` about `ω` to `q` and renormalizes.
#[inline]
pub fn integrate_rotation(q: Quat, angular_velocity: Vec3, dt: f32) -> Quat {
    let delta = angular_velocity * dt;
    if delta.length_squared() < f32::EPSILON * f32::EPSILON {
        return q.normalize();
    }
    (Quat::from_scaled_axis(delta) * q).normalize()
}
