//! # kitesim-solver
//!
//! Time integration, constraint projection and simulation state for a
//! kite tethered by two lines.
//!
//! ## Key Types
//!
//! - [`RigidBodyState`]: pose, velocities and mass properties of the kite
//! - [`KiteGeometry`]: kite-frame points, control points derived from bridles
//! - [`ConstraintSet`]: two line constraints and the ground constraint
//! - [`ConstraintSolver`]: pluggable projection trait; [`PositionBasedSolver`]
//!   is the production implementation
//! - [`KiteController`]: force smoothing and semi-implicit Euler integration
//! - [`TensionModel`]: advisory line/bridle tension read-model
//! - [`KiteSimulation`]: lifecycle driver (initialize, step, reset, dispose)

pub mod config;
pub mod constraints;
pub mod controller;
pub mod geometry;
pub mod pbd;
pub mod simulation;
pub mod state;
pub mod tension;

pub use config::{KiteConfig, SolverConfig};
pub use constraints::{ConstraintSet, HandlePositions};
pub use controller::{KiteController, MotionWarnings};
pub use geometry::{BridleLengths, KiteGeometry};
pub use pbd::{ConstraintSolver, PositionBasedSolver, SolveReport, UnconstrainedSolver};
pub use simulation::{FrameInputs, KiteSimulation, StepReport};
pub use state::{Pose, RigidBodyState};
pub use tension::{TensionModel, TensionReport};
