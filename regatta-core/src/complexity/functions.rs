//! The candidate complexity curves.

use serde::{Deserialize, Serialize};
use statrs::function::gamma::gamma;

/// Largest x for which `gamma(x + 1)` is finite in f64; `compute` saturates
/// to infinity beyond it rather than overflowing silently.
pub const FACTORIAL_SATURATION_LIMIT: f64 = 170.0;

/// A candidate complexity curve of the form `y = scale * f(x) + bias`.
///
/// Each variant is a stateless pure function; fitting solves for `scale` and
/// `bias` against observed measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplexityFunction {
    Linear,
    NLogN,
    Quadratic,
    Cubic,
    LogLinear,
    SqrtN,
    Exponential,
    Factorial,
}

impl ComplexityFunction {
    /// Every candidate, in fitting order.
    pub const ALL: [ComplexityFunction; 8] = [
        ComplexityFunction::Linear,
        ComplexityFunction::NLogN,
        ComplexityFunction::Quadratic,
        ComplexityFunction::Cubic,
        ComplexityFunction::LogLinear,
        ComplexityFunction::SqrtN,
        ComplexityFunction::Exponential,
        ComplexityFunction::Factorial,
    ];

    /// Evaluate `scale * f(x) + bias`.
    ///
    /// `Factorial` computes the gamma function iteratively through `statrs`
    /// and saturates to `f64::INFINITY` for x above
    /// [`FACTORIAL_SATURATION_LIMIT`]; the logarithmic forms are defined for
    /// x > 0.
    pub fn compute(&self, x: f64, scale: f64, bias: f64) -> f64 {
        scale * self.basis(x) + bias
    }

    /// The underlying basis function f(x).
    pub(crate) fn basis(&self, x: f64) -> f64 {
        match self {
            ComplexityFunction::Linear => x,
            ComplexityFunction::NLogN => x * x.ln(),
            ComplexityFunction::Quadratic => x * x,
            ComplexityFunction::Cubic => x * x * x,
            ComplexityFunction::LogLinear => x.log2(),
            ComplexityFunction::SqrtN => x.sqrt(),
            ComplexityFunction::Exponential => 2.0_f64.powf(x),
            ComplexityFunction::Factorial => {
                if x > FACTORIAL_SATURATION_LIMIT {
                    f64::INFINITY
                } else {
                    gamma(x + 1.0)
                }
            }
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            ComplexityFunction::Linear => "Linear",
            ComplexityFunction::NLogN => "NLogN",
            ComplexityFunction::Quadratic => "Quadratic",
            ComplexityFunction::Cubic => "Cubic",
            ComplexityFunction::LogLinear => "LogLinear",
            ComplexityFunction::SqrtN => "SqrtN",
            ComplexityFunction::Exponential => "Exponential",
            ComplexityFunction::Factorial => "Factorial",
        }
    }

    /// Big-O label.
    pub fn big_o(&self) -> &'static str {
        match self {
            ComplexityFunction::Linear => "O(n)",
            ComplexityFunction::NLogN => "O(n log n)",
            ComplexityFunction::Quadratic => "O(n^2)",
            ComplexityFunction::Cubic => "O(n^3)",
            ComplexityFunction::LogLinear => "O(log n)",
            ComplexityFunction::SqrtN => "O(sqrt(n))",
            ComplexityFunction::Exponential => "O(2^n)",
            ComplexityFunction::Factorial => "O(n!)",
        }
    }

    /// Qualitative scaling rank; lower grows slower.
    pub fn quality(&self) -> u8 {
        match self {
            ComplexityFunction::LogLinear => 1,
            ComplexityFunction::SqrtN => 2,
            ComplexityFunction::Linear => 3,
            ComplexityFunction::NLogN => 4,
            ComplexityFunction::Quadratic => 5,
            ComplexityFunction::Cubic => 6,
            ComplexityFunction::Exponential => 7,
            ComplexityFunction::Factorial => 8,
        }
    }
}
