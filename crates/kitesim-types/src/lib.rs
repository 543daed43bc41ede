//! # kitesim-types
//!
//! Shared types, identifiers, error types, and physical constants
//! for the kitesim tethered-kite physics core.
//!
//! This crate has zero domain logic; it defines the vocabulary
//! that all other kitesim crates share.

pub mod constants;
pub mod error;
pub mod ids;

pub use error::{KiteError, KiteResult};
pub use ids::{ConstraintCategory, KitePoint, Side};
