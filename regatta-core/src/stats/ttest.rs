use std::collections::BTreeMap;

use statrs::distribution::{ContinuousCDF, StudentsT};

use super::descriptive::{mean, sample_variance};
use super::{TestComputation, TestKind, TwoSampleTest};
use crate::error::AnalysisError;

/// Welch's t-test for two independent samples with potentially unequal
/// variances.
///
/// This is the recommended t-test variant for timing comparisons because it
/// does not assume equal variances between the before and after samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct WelchTTest;

/// Degrees of freedom via the Welch-Satterthwaite equation.
///
/// df = (var1/n1 + var2/n2)^2 / ((var1/n1)^2/(n1-1) + (var2/n2)^2/(n2-1))
fn welch_satterthwaite_df(var1: f64, n1: usize, var2: f64, n2: usize) -> f64 {
    let s1 = var1 / n1 as f64;
    let s2 = var2 / n2 as f64;
    let numerator = (s1 + s2).powi(2);
    let denominator = (s1.powi(2) / (n1 - 1) as f64) + (s2.powi(2) / (n2 - 1) as f64);

    if denominator == 0.0 {
        // Fallback to minimum df when both variances are zero
        return (n1.min(n2) - 1) as f64;
    }

    numerator / denominator
}

impl TwoSampleTest for WelchTTest {
    fn kind(&self) -> TestKind {
        TestKind::WelchT
    }

    fn compute(&self, before: &[f64], after: &[f64]) -> Result<TestComputation, AnalysisError> {
        let n1 = before.len();
        let n2 = after.len();

        if n1 < 2 || n2 < 2 {
            return Err(AnalysisError::InsufficientData(format!(
                "Welch t-test requires at least 2 observations per sample, got {} and {}",
                n1, n2
            )));
        }

        let mean1 = mean(before);
        let mean2 = mean(after);
        let var1 = sample_variance(before, mean1);
        let var2 = sample_variance(after, mean2);

        // Standard error of the difference of means
        let se = (var1 / n1 as f64 + var2 / n2 as f64).sqrt();
        let df = welch_satterthwaite_df(var1, n1, var2, n2);

        let mut details = BTreeMap::new();
        details.insert("degrees_of_freedom".to_string(), df);

        // Both samples constant: the distributions either coincide or are
        // disjoint point masses.
        if se == 0.0 {
            let (statistic, p_value) = if mean1 == mean2 {
                (0.0, 1.0)
            } else {
                ((mean1 - mean2).signum() * f64::INFINITY, 0.0)
            };
            return Ok(TestComputation {
                statistic,
                p_value,
                details,
            });
        }

        // t = (mean1 - mean2) / sqrt(var1/n1 + var2/n2)
        let t_statistic = (mean1 - mean2) / se;

        // Two-tailed p-value: p = 2 * P(T > |t|)
        let p_value = match StudentsT::new(0.0, 1.0, df) {
            Ok(dist) => (2.0 * (1.0 - dist.cdf(t_statistic.abs()))).clamp(0.0, 1.0),
            Err(_) => 1.0, // Conservative fallback if distribution creation fails
        };

        Ok(TestComputation {
            statistic: t_statistic,
            p_value,
            details,
        })
    }
}
