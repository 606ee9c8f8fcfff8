//! Goodness-of-fit metrics for a fitted curve.

use serde::{Deserialize, Serialize};

use super::fitting::FittedCurve;
use super::ComplexityMeasurement;

/// Goodness-of-fit metrics comparing a fitted curve's predictions to the
/// observed means. R² is the primary ranking metric; RMSE breaks ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessResult {
    pub r_squared: f64,
    pub rmse: f64,
    pub mae: f64,
    pub sse: f64,
}

/// Score `curve` against the observed measurements.
pub fn score(curve: &FittedCurve, measurements: &[ComplexityMeasurement]) -> FitnessResult {
    let n = measurements.len() as f64;

    let mut sse = 0.0;
    let mut sae = 0.0;
    for m in measurements {
        let residual = m.y - curve.predict(m.x);
        sse += residual * residual;
        sae += residual.abs();
    }

    let mean_y: f64 = measurements.iter().map(|m| m.y).sum::<f64>() / n;
    let ss_tot: f64 = measurements.iter().map(|m| (m.y - mean_y).powi(2)).sum();

    let r_squared = if !sse.is_finite() {
        f64::NEG_INFINITY
    } else if ss_tot == 0.0 {
        // Constant observations: perfect iff the residuals vanish too.
        if sse < 1e-12 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - sse / ss_tot
    };

    FitnessResult {
        r_squared,
        rmse: (sse / n).sqrt(),
        mae: sae / n,
        sse,
    }
}
