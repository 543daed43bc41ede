//! State snapshot serialization for replay and debugging.
//!
//! Snapshots capture the kite's kinematic state at a point in time,
//! enabling replay from a known pose and diff-based debugging.

use std::path::Path;

use kitesim_math::{Quat, Vec3};
use kitesim_types::{KiteError, KiteResult};
use serde::{Deserialize, Serialize};

/// A kinematic snapshot of the kite.
///
/// Serialized with `bincode` for compact binary output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KiteSnapshot {
    /// Timestep index when this snapshot was taken.
    pub timestep: u32,
    /// Simulation time in seconds.
    pub sim_time: f64,
    /// Center-of-mass position [x, y, z].
    pub position: [f32; 3],
    /// Orientation quaternion [x, y, z, w].
    pub orientation: [f32; 4],
    pub velocity: [f32; 3],
    pub angular_velocity: [f32; 3],
    /// Current left/right line rest lengths.
    pub line_lengths: [f32; 2],
}

impl KiteSnapshot {
    pub fn new(
        timestep: u32,
        sim_time: f64,
        position: Vec3,
        orientation: Quat,
        velocity: Vec3,
        angular_velocity: Vec3,
        line_lengths: [f32; 2],
    ) -> Self {
        Self {
            timestep,
            sim_time,
            position: position.to_array(),
            orientation: orientation.to_array(),
            velocity: velocity.to_array(),
            angular_velocity: angular_velocity.to_array(),
            line_lengths,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_array(self.orientation)
    }

    pub fn velocity(&self) -> Vec3 {
        Vec3::from_array(self.velocity)
    }

    pub fn angular_velocity(&self) -> Vec3 {
        Vec3::from_array(self.angular_velocity)
    }

    /// Serializes to compact binary format.
    pub fn to_bytes(&self) -> KiteResult<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| KiteError::Serialization(format!("snapshot serialization failed: {e}")))
    }

    /// Deserializes from binary format.
    pub fn from_bytes(data: &[u8]) -> KiteResult<Self> {
        bincode::deserialize(data)
            .map_err(|e| KiteError::Serialization(format!("snapshot deserialization failed: {e}")))
    }

    /// Writes the snapshot to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> KiteResult<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Reads a snapshot from `path`.
    pub fn load(path: impl AsRef<Path>) -> KiteResult<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }
}
