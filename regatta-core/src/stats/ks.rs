//! Two-sample Kolmogorov-Smirnov test.

use std::collections::BTreeMap;

use super::{TestComputation, TestKind, TwoSampleTest};
use crate::error::AnalysisError;

/// Two-sample Kolmogorov-Smirnov test.
///
/// The statistic is the maximum absolute difference between the two empirical
/// CDFs, so it is sensitive to any distributional change, not just a location
/// shift. The p-value uses the asymptotic Kolmogorov distribution with the
/// small-sample correction of the effective sample size.
#[derive(Debug, Clone, Copy, Default)]
pub struct KolmogorovSmirnovTest;

impl TwoSampleTest for KolmogorovSmirnovTest {
    fn kind(&self) -> TestKind {
        TestKind::KolmogorovSmirnov
    }

    fn compute(&self, before: &[f64], after: &[f64]) -> Result<TestComputation, AnalysisError> {
        let n1 = before.len();
        let n2 = after.len();
        if n1 == 0 || n2 == 0 {
            return Err(AnalysisError::InvalidInput(
                "Kolmogorov-Smirnov test requires non-empty samples on both sides".to_string(),
            ));
        }

        let mut sorted1 = before.to_vec();
        let mut sorted2 = after.to_vec();
        sorted1.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sorted2.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let d = max_cdf_distance(&sorted1, &sorted2);

        let effective_n = (n1 * n2) as f64 / (n1 + n2) as f64;
        let sqrt_n = effective_n.sqrt();
        let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * d;
        let p_value = kolmogorov_survival(lambda);

        let mut details = BTreeMap::new();
        details.insert("lambda".to_string(), lambda);
        details.insert("effective_n".to_string(), effective_n);

        Ok(TestComputation {
            statistic: d,
            p_value,
            details,
        })
    }
}

/// Maximum absolute difference between the empirical CDFs of two sorted
/// samples.
fn max_cdf_distance(sorted1: &[f64], sorted2: &[f64]) -> f64 {
    let n1 = sorted1.len() as f64;
    let n2 = sorted2.len() as f64;
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;

    while i < sorted1.len() && j < sorted2.len() {
        let x = sorted1[i].min(sorted2[j]);
        while i < sorted1.len() && sorted1[i] <= x {
            i += 1;
        }
        while j < sorted2.len() && sorted2[j] <= x {
            j += 1;
        }
        let cdf1 = i as f64 / n1;
        let cdf2 = j as f64 / n2;
        d = d.max((cdf1 - cdf2).abs());
    }

    d
}

/// Asymptotic two-sided p-value: Q(lambda) = 2 * sum (-1)^(k-1) e^(-2 k^2 lambda^2).
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }

    let mut sum = 0.0;
    let mut sign = 1.0;
    for k in 1..=100 {
        let k = k as f64;
        let term = sign * (-2.0 * k * k * lambda * lambda).exp();
        sum += term;
        sign = -sign;
        if term.abs() < 1e-12 {
            break;
        }
    }

    (2.0 * sum).clamp(0.0, 1.0)
}
