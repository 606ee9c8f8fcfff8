//! Wilcoxon signed-rank test over paired samples.

use std::collections::BTreeMap;

use statrs::distribution::{ContinuousCDF, Normal};

use super::rank::{midranks, tie_term};
use super::{TestComputation, TestKind, TwoSampleTest};
use crate::error::AnalysisError;

/// Wilcoxon signed-rank test for paired samples.
///
/// Pairs are formed positionally, so both samples must have the same length;
/// a mismatch is an error, never silent truncation. Pairs with an exactly
/// zero difference are excluded before ranking, and tied absolute differences
/// receive midranks. The p-value uses the normal approximation with tie
/// correction.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignedRankTest;

impl TwoSampleTest for SignedRankTest {
    fn kind(&self) -> TestKind {
        TestKind::SignedRank
    }

    fn compute(&self, before: &[f64], after: &[f64]) -> Result<TestComputation, AnalysisError> {
        if before.len() != after.len() {
            return Err(AnalysisError::DimensionMismatch {
                before: before.len(),
                after: after.len(),
            });
        }
        if before.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "signed-rank test requires non-empty paired samples".to_string(),
            ));
        }

        // Differences with exact zeros excluded.
        let diffs: Vec<f64> = before
            .iter()
            .zip(after.iter())
            .map(|(b, a)| a - b)
            .filter(|d| *d != 0.0)
            .collect();

        if diffs.is_empty() {
            return Err(AnalysisError::InsufficientData(
                "all paired differences are zero".to_string(),
            ));
        }

        let n = diffs.len();
        let abs_diffs: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
        let ranks = midranks(&abs_diffs);

        let w_plus: f64 = diffs
            .iter()
            .zip(ranks.iter())
            .filter(|(d, _)| **d > 0.0)
            .map(|(_, r)| r)
            .sum();
        let total = (n * (n + 1)) as f64 / 2.0;
        let w_minus = total - w_plus;

        let mu = total / 2.0;
        let variance =
            (n * (n + 1) * (2 * n + 1)) as f64 / 24.0 - tie_term(&abs_diffs) / 48.0;

        let mut details = BTreeMap::new();
        details.insert("w_plus".to_string(), w_plus);
        details.insert("w_minus".to_string(), w_minus);
        details.insert("pairs_used".to_string(), n as f64);

        let (p_value, z) = if variance <= 0.0 {
            (1.0, 0.0)
        } else {
            let diff = w_plus - mu;
            let corrected = diff - 0.5 * diff.signum();
            let z = corrected / variance.sqrt();
            let p = match Normal::new(0.0, 1.0) {
                Ok(dist) => (2.0 * (1.0 - dist.cdf(z.abs()))).clamp(0.0, 1.0),
                Err(_) => 1.0,
            };
            (p, z)
        };
        details.insert("z".to_string(), z);

        Ok(TestComputation {
            statistic: w_plus.min(w_minus),
            p_value,
            details,
        })
    }
}
