//! Error types for trajectory reduction and loss grid evaluation.

use thiserror::Error;

/// Result type alias for landscape operations.
pub type Result<T> = std::result::Result<T, LandscapeError>;

/// Errors that can occur while reducing a trajectory or building a loss grid.
///
/// Every variant is fail-fast: none of them describe a transient condition,
/// so nothing in this crate retries or falls back on its own.
#[derive(Debug, Error)]
pub enum LandscapeError {
    /// The trajectory has no steps.
    #[error("empty trajectory: no parameter snapshots provided")]
    EmptyTrajectory,

    /// The reduction method needs more steps than the trajectory has.
    #[error("insufficient steps: need at least {min}, got {got}")]
    InsufficientSteps {
        /// Minimum number of steps.
        min: usize,
        /// Actual number of steps.
        got: usize,
    },

    /// The parameter space is too small to span a plane.
    #[error("insufficient dimensions: need at least {min} parameters, got {got}")]
    InsufficientDimensions {
        /// Minimum parameter dimension.
        min: usize,
        /// Actual parameter dimension.
        got: usize,
    },

    /// A trajectory step has a different dimension than the first step.
    #[error("inconsistent dimension at step {step}: expected {expected}, got {got}")]
    InconsistentDimension {
        /// Position of the offending step.
        step: usize,
        /// Dimension of the first step.
        expected: usize,
        /// Dimension of the offending step.
        got: usize,
    },

    /// A trajectory step holds a NaN or infinite parameter.
    #[error("non-finite parameter at step {step}, index {index}")]
    NonFiniteParameters {
        /// Position of the offending step.
        step: usize,
        /// Index of the first non-finite parameter.
        index: usize,
    },

    /// A caller-supplied direction does not match the trajectory dimension.
    #[error("direction shape mismatch: expected {expected} parameters, got {got}")]
    DirectionShapeMismatch {
        /// Trajectory dimension.
        expected: usize,
        /// Direction dimension.
        got: usize,
    },

    /// A basis direction does not match the model's parameter count.
    #[error("direction dimension mismatch: model has {expected} parameters, direction has {got}")]
    DirectionDimensionMismatch {
        /// Model parameter count.
        expected: usize,
        /// Direction dimension.
        got: usize,
    },

    /// A flat parameter vector has the wrong length for the model.
    #[error("parameter count mismatch: expected {expected}, got {got}")]
    ParameterCountMismatch {
        /// Model parameter count.
        expected: usize,
        /// Provided vector length.
        got: usize,
    },

    /// Forward evaluation failed or produced an unusable loss.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// Grid bounds collapsed or are not finite.
    #[error("degenerate grid on {axis} axis: [{min}, {max}]")]
    DegenerateGrid {
        /// Axis name (`x` or `y`).
        axis: &'static str,
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },

    /// Invalid configuration parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Candle tensor operation error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl LandscapeError {
    /// Create an evaluation error.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Create an invalid config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
