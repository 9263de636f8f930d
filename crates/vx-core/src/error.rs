//! Error types for VoxSplit

use thiserror::Error;

/// Core error type
///
/// Every pipeline stage surfaces failures through this enum; nothing is
/// recovered locally except the defined sentinel outcomes in attribution.
#[derive(Error, Debug)]
pub enum VxError {
    /// Input audio is unusable (empty, silent, malformed channel layout)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not enough observations for the requested model order
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Iterative estimation exhausted its budget without converging
    #[error("Did not converge after {iterations} iterations (tolerance {tolerance})")]
    Convergence { iterations: usize, tolerance: f64 },

    /// Configuration rejected before any processing started
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Numeric/DSP failure inside a stage
    #[error("DSP error: {0}")]
    Dsp(String),
}

/// Result type alias
pub type VxResult<T> = Result<T, VxError>;
