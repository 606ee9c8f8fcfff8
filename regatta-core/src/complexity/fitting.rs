//! Nonlinear least-squares fitting of one candidate curve.
//!
//! Levenberg-Marquardt over the two-parameter model `y = scale * f(x) + bias`
//! with the analytic Jacobian `[f(x), 1]`. Non-convergence within the
//! iteration budget is not an error: the best parameters reached are
//! returned with `converged = false`.

use serde::{Deserialize, Serialize};

use super::functions::ComplexityFunction;
use super::ComplexityMeasurement;
use crate::error::AnalysisError;

/// Fitting configuration. One canonical configuration is used for every
/// candidate function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub max_iterations: usize,
    /// Convergence threshold on the squared-error improvement per step.
    pub tolerance: f64,
    pub initial_scale: f64,
    pub initial_bias: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
            initial_scale: 1.0,
            initial_bias: 0.0,
        }
    }
}

/// Result of fitting one candidate curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedCurve {
    pub function: ComplexityFunction,
    pub scale: f64,
    pub bias: f64,
    pub converged: bool,
    pub iterations: usize,
}

impl FittedCurve {
    /// Predicted duration at input size `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.function.compute(x, self.scale, self.bias)
    }
}

/// Fit `function` to the measurements by damped least squares.
///
/// # Errors
///
/// `InvalidInput` when fewer than two measurements are supplied (a
/// two-parameter curve is underdetermined) or when the candidate's basis is
/// not finite over the observed range (e.g. Factorial past its saturation
/// bound), which makes the candidate unfittable.
pub fn fit(
    function: ComplexityFunction,
    measurements: &[ComplexityMeasurement],
    options: &FitOptions,
) -> Result<FittedCurve, AnalysisError> {
    if measurements.len() < 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "cannot fit a two-parameter curve to {} measurement(s)",
            measurements.len()
        )));
    }

    let basis: Vec<f64> = measurements.iter().map(|m| function.basis(m.x)).collect();
    if basis.iter().any(|f| !f.is_finite()) {
        return Err(AnalysisError::InvalidInput(format!(
            "{} is not finite over the observed input range",
            function.name()
        )));
    }

    let n = measurements.len() as f64;
    let mut scale = options.initial_scale;
    let mut bias = options.initial_bias;
    let mut lambda = 1e-3;
    let mut sse = squared_error(measurements, &basis, scale, bias);
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..options.max_iterations {
        iterations = iter;
        if sse <= options.tolerance {
            converged = true;
            break;
        }

        // Normal equations for the damped step.
        let mut sum_ff = 0.0;
        let mut sum_f = 0.0;
        let mut sum_fr = 0.0;
        let mut sum_r = 0.0;
        for (m, &f) in measurements.iter().zip(basis.iter()) {
            let r = m.y - (scale * f + bias);
            sum_ff += f * f;
            sum_f += f;
            sum_fr += f * r;
            sum_r += r;
        }

        let a11 = sum_ff * (1.0 + lambda);
        let a22 = n * (1.0 + lambda);
        let det = a11 * a22 - sum_f * sum_f;
        if det.abs() < f64::MIN_POSITIVE || !det.is_finite() {
            break;
        }

        let delta_scale = (sum_fr * a22 - sum_f * sum_r) / det;
        let delta_bias = (a11 * sum_r - sum_f * sum_fr) / det;

        let trial_sse = squared_error(measurements, &basis, scale + delta_scale, bias + delta_bias);

        if trial_sse.is_finite() && trial_sse < sse {
            let improvement = sse - trial_sse;
            scale += delta_scale;
            bias += delta_bias;
            sse = trial_sse;
            lambda = (lambda / 10.0).max(1e-12);
            if improvement <= options.tolerance * sse.max(f64::MIN_POSITIVE) {
                converged = true;
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e12 {
                break;
            }
        }
    }

    Ok(FittedCurve {
        function,
        scale,
        bias,
        converged,
        iterations,
    })
}

fn squared_error(
    measurements: &[ComplexityMeasurement],
    basis: &[f64],
    scale: f64,
    bias: f64,
) -> f64 {
    measurements
        .iter()
        .zip(basis.iter())
        .map(|(m, &f)| {
            let r = m.y - (scale * f + bias);
            r * r
        })
        .sum()
}
