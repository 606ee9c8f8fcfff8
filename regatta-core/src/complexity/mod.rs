//! Empirical complexity estimation.
//!
//! Feeds (input size, mean duration) observations through nonlinear
//! least-squares fits of a fixed family of candidate curves and ranks the
//! candidates by goodness of fit.

use serde::{Deserialize, Serialize};

pub mod estimator;
pub mod fitness;
pub mod fitting;
pub mod functions;

pub use estimator::{estimate_complexity, ComplexityModel, ScalingCandidate};
pub use fitness::FitnessResult;
pub use fitting::{fit, FitOptions, FittedCurve};
pub use functions::ComplexityFunction;

/// One empirical observation: input size `x` against mean duration `y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityMeasurement {
    pub x: f64,
    pub y: f64,
}

impl ComplexityMeasurement {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
