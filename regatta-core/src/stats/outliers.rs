//! Tukey-fence outlier detection over raw timing samples.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Partition of a raw sample into in-fence data and outliers.
///
/// The three partitions are disjoint and together contain every input value,
/// so `data_with_outliers_removed.len() + lower_outliers.len() +
/// upper_outliers.len()` always equals the input length. Values within each
/// partition keep their input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierAnalysis {
    pub data_with_outliers_removed: Vec<f64>,
    pub lower_outliers: Vec<f64>,
    pub upper_outliers: Vec<f64>,
}

impl OutlierAnalysis {
    /// Total number of values classified as outliers on either side.
    pub fn total_outliers(&self) -> usize {
        self.lower_outliers.len() + self.upper_outliers.len()
    }
}

/// Classify `data` against Tukey fences at 1.5 IQR below Q1 and above Q3.
///
/// Deterministic: the same input always yields the same partition.
///
/// # Errors
///
/// Returns `InvalidInput` for an empty sample; fences over zero observations
/// are meaningless.
pub fn detect_outliers(data: &[f64]) -> Result<OutlierAnalysis, AnalysisError> {
    if data.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "cannot compute Tukey fences over an empty sample".to_string(),
        ));
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q1 = quartile(&sorted, 0.25);
    let q3 = quartile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let mut analysis = OutlierAnalysis {
        data_with_outliers_removed: Vec::with_capacity(data.len()),
        lower_outliers: Vec::new(),
        upper_outliers: Vec::new(),
    };

    for &value in data {
        if value < lower_fence {
            analysis.lower_outliers.push(value);
        } else if value > upper_fence {
            analysis.upper_outliers.push(value);
        } else {
            analysis.data_with_outliers_removed.push(value);
        }
    }

    Ok(analysis)
}

/// Quantile of sorted data by linear interpolation between closest ranks.
fn quartile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;

    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}
