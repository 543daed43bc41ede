//! Error types for the kitesim core.
//!
//! Only configuration-time and I/O operations are fallible. The per-frame
//! step never returns an error: anomalies are recovered in place and routed
//! to telemetry.

use thiserror::Error;

/// Unified error type for the kitesim workspace.
#[derive(Debug, Error)]
pub enum KiteError {
    /// Anchor or point geometry is degenerate (coincident, collinear, non-finite).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Bridle lengths cannot meet at a single control point.
    #[error("Infeasible bridle on {side} side: {reason}")]
    InfeasibleBridle {
        side: &'static str,
        reason: String,
    },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A simulation invariant was violated.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Convenience alias for `Result<T, KiteError>`.
pub type KiteResult<T> = Result<T, KiteError>;
