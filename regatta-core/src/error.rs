use thiserror::Error;

/// Errors produced by the analysis components.
///
/// `InvalidInput` covers malformed inputs regardless of size; `InsufficientData`
/// is reserved for well-formed samples that are too small for the requested
/// statistic. Non-convergence of iterative procedures is deliberately *not* an
/// error: curve fitting reports the best achieved fit and adaptive sampling
/// terminates at its hard cap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Empty or degenerate sample arrays, or values outside the domain a
    /// computation requires.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Sample count too low for the requested statistic (e.g. variance
    /// requires at least two observations).
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Paired samples with different lengths.
    #[error("Paired samples must have equal lengths: before has {before}, after has {after}")]
    DimensionMismatch { before: usize, after: usize },

    /// A measured case body failed; the message carries the captured error.
    #[error("Execution failed: {0}")]
    ExecutionFailure(String),
}
