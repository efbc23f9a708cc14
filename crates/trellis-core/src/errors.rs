//! Error types for the Trellis layout engine.

use thiserror::Error;

/// Errors from invalid caller-supplied configuration.  These surface at the
/// call that set them up; the caller must fix the input before retrying.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("unknown constraint strength tag: {tag:?}")]
    UnknownStrength { tag: String },

    #[error("padding must be finite, non-negative and below half the figure, got {value}")]
    InvalidPadding { value: f64 },

    #[error("malformed grid specification: {reason}")]
    MalformedGrid { reason: String },
}

/// Errors during constraint solving.
#[derive(Debug, Clone, Error)]
pub enum ConstraintError {
    /// Required-tier constraints are mutually contradictory.  Detected at
    /// solve time, since constraint additions are batched.
    #[error("required layout constraints are mutually unsatisfiable")]
    Unsatisfiable,

    #[error("variable has no registered edit")]
    UnknownEditVariable,

    #[error("variable already has a registered edit")]
    DuplicateEditVariable,

    #[error("edit variables cannot use the required strength")]
    InvalidEditStrength,

    #[error("internal solver error: {0}")]
    Internal(&'static str),
}

/// Top-level error type for a layout invocation.
#[derive(Debug, Clone, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),
}
