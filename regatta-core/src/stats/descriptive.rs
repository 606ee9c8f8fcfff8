//! Descriptive statistics over one run's timing sample.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::AnalysisError;

/// Confidence interval around a sample mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Confidence level the interval was computed at, e.g. 0.95.
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
    pub margin_of_error: f64,
    pub standard_error: f64,
}

/// Summary of one raw timing sample.
///
/// Variance uses the sample convention (n - 1 denominator, Bessel's
/// correction) throughout, so `std_dev` is always `variance.sqrt()`. No
/// rounding happens here; significant-digit rounding is a reporting concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStatistics {
    pub sample_size: usize,
    pub mean: f64,
    pub median: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub confidence_interval: ConfidenceInterval,
}

impl DescriptiveStatistics {
    /// Compile summary statistics from a timing sample.
    ///
    /// The confidence interval uses a Student's t critical value at
    /// `sample_size - 1` degrees of freedom.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientData` when fewer than two observations are
    /// available (variance is undefined), and `InvalidInput` for a
    /// confidence level outside (0, 1).
    pub fn compile(samples: &[f64], confidence_level: f64) -> Result<Self, AnalysisError> {
        if samples.len() < 2 {
            return Err(AnalysisError::InsufficientData(format!(
                "descriptive statistics require at least 2 observations, got {}",
                samples.len()
            )));
        }
        if !(0.0..1.0).contains(&confidence_level) || confidence_level == 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "confidence level must be in (0, 1), got {}",
                confidence_level
            )));
        }

        let n = samples.len();
        let mean = mean(samples);
        let variance = sample_variance(samples, mean);
        let std_dev = variance.sqrt();
        let median = median(samples);

        let standard_error = std_dev / (n as f64).sqrt();
        let t_crit = t_critical_value(confidence_level, (n - 1) as f64);
        let margin_of_error = t_crit * standard_error;

        Ok(Self {
            sample_size: n,
            mean,
            median,
            variance,
            std_dev,
            confidence_interval: ConfidenceInterval {
                level: confidence_level,
                lower: mean - margin_of_error,
                upper: mean + margin_of_error,
                margin_of_error,
                standard_error,
            },
        })
    }
}

/// Arithmetic mean. Zero for an empty slice.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Sample variance with Bessel's correction (n - 1 denominator).
pub fn sample_variance(samples: &[f64], mean: f64) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let sum_sq_diff: f64 = samples.iter().map(|x| (x - mean).powi(2)).sum();
    sum_sq_diff / (samples.len() - 1) as f64
}

/// Textbook median: middle element for odd counts, average of the two middle
/// elements for even counts. Zero for an empty slice.
pub fn median(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Two-sided Student's t critical value at the given confidence level.
pub(crate) fn t_critical_value(confidence_level: f64, degrees_of_freedom: f64) -> f64 {
    match StudentsT::new(0.0, 1.0, degrees_of_freedom.max(1.0)) {
        Ok(dist) => dist.inverse_cdf(1.0 - (1.0 - confidence_level) / 2.0),
        // Conservative fallback if the distribution cannot be constructed.
        Err(_) => 1.96,
    }
}
