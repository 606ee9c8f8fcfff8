//! Before/after comparison engine.
//!
//! Joins two compiled runs on case identity, applies the configured
//! preprocessing (optional Tukey outlier stripping; random downsampling for
//! the rank-sum path), runs the selected two-sample test, classifies the
//! shift, and adjusts p-values across the batch with Benjamini-Hochberg.
//! One case's failure never aborts the rest of the batch.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use regatta_core::stats::{
    classify_change, detect_outliers, downsample, mean, median, sample_variance, RankSumTest,
    StatisticalTestResult, TestComputation, TestKind, TwoSampleTest,
};
use regatta_core::{benjamini_hochberg, ratio_ci, AnalysisError, TestCaseId};

use crate::compiler::PerformanceRunResult;
use crate::config::{AnalysisSettings, DownsampleSettings};

/// One case's comparison outcome. A failed analysis carries the error here
/// instead of aborting the batch, so downstream reporting can render the
/// failure next to the successes.
#[derive(Debug, Clone)]
pub struct CaseComparison {
    pub id: TestCaseId,
    pub outcome: Result<StatisticalTestResult, AnalysisError>,
}

/// Batch result of comparing two runs.
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    /// Per-case comparisons, in "before"-run order.
    pub comparisons: Vec<CaseComparison>,
    /// Benjamini-Hochberg q-values across the successful comparisons.
    pub q_values: BTreeMap<TestCaseId, f64>,
    /// Cases present in only one of the two runs.
    pub skipped: usize,
}

/// The comparison engine.
pub struct DiffEngine {
    analysis: AnalysisSettings,
    downsample: DownsampleSettings,
}

impl DiffEngine {
    pub fn new(analysis: AnalysisSettings, downsample: DownsampleSettings) -> Self {
        Self {
            analysis,
            downsample,
        }
    }

    /// Compare two compiled runs case by case.
    ///
    /// Cases are joined on their identity; a case present in only one run is
    /// skipped and counted. The q-value map covers every comparison that
    /// produced a p-value.
    pub async fn compare_runs(
        &self,
        before: &[PerformanceRunResult],
        after: &[PerformanceRunResult],
    ) -> ComparisonReport {
        let after_by_id: BTreeMap<&TestCaseId, &PerformanceRunResult> =
            after.iter().map(|r| (&r.id, r)).collect();

        let mut comparisons = Vec::new();
        let mut matched = 0usize;
        for b in before {
            if let Some(a) = after_by_id.get(&b.id) {
                matched += 1;
                comparisons.push(
                    self.compare_case(&b.id, &b.raw_sample, &a.raw_sample)
                        .await,
                );
            }
        }
        let skipped = (before.len() - matched) + (after.len() - matched);

        let p_values: BTreeMap<TestCaseId, f64> = comparisons
            .iter()
            .filter_map(|c| {
                c.outcome
                    .as_ref()
                    .ok()
                    .map(|result| (c.id.clone(), result.p_value))
            })
            .collect();
        let q_values = benjamini_hochberg(&p_values);

        ComparisonReport {
            comparisons,
            q_values,
            skipped,
        }
    }

    /// Compare one case's raw before/after samples.
    pub async fn compare_case(
        &self,
        id: &TestCaseId,
        before: &[f64],
        after: &[f64],
    ) -> CaseComparison {
        CaseComparison {
            id: id.clone(),
            outcome: self.analyze(before, after).await,
        }
    }

    async fn analyze(
        &self,
        before: &[f64],
        after: &[f64],
    ) -> Result<StatisticalTestResult, AnalysisError> {
        if before.is_empty() || after.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "comparison requires non-empty samples on both sides".to_string(),
            ));
        }

        let kind = self.analysis.test;

        // Outlier stripping is skipped for the paired test: stripping each
        // side independently would break the pairing.
        let (filtered_before, filtered_after) =
            if self.analysis.outlier_detection && kind != TestKind::SignedRank {
                (
                    detect_outliers(before)?.data_with_outliers_removed,
                    detect_outliers(after)?.data_with_outliers_removed,
                )
            } else {
                (before.to_vec(), after.to_vec())
            };

        let (computation, significant) = match kind {
            TestKind::RankSum => {
                self.rank_sum_repeated(&filtered_before, &filtered_after)
                    .await?
            }
            _ => {
                let computation = kind.test().compute(&filtered_before, &filtered_after)?;
                let significant = computation.p_value <= self.analysis.alpha;
                (computation, significant)
            }
        };

        let mean_before = mean(&filtered_before);
        let mean_after = mean(&filtered_after);
        let median_before = median(&filtered_before);
        let median_after = median(&filtered_after);

        let (location_before, location_after) = if kind.classifies_on_mean() {
            (mean_before, mean_after)
        } else {
            (median_before, median_after)
        };
        let change = classify_change(significant, location_before, location_after);

        // Effect size as an after/before ratio with a confidence interval;
        // bounds are omitted when the ratio is unstable in log space.
        let mut details = computation.details;
        let se_before = standard_error(&filtered_before, mean_before);
        let se_after = standard_error(&filtered_after, mean_after);
        let ratio = ratio_ci(
            mean_before,
            se_before,
            filtered_before.len(),
            mean_after,
            se_after,
            filtered_after.len(),
            self.analysis.confidence_level,
        );
        details.insert("ratio".to_string(), ratio.ratio);
        if let (Some(lower), Some(upper)) = (ratio.lower, ratio.upper) {
            details.insert("ratio_ci_lower".to_string(), lower);
            details.insert("ratio_ci_upper".to_string(), upper);
        }

        Ok(StatisticalTestResult {
            test: kind,
            mean_before,
            mean_after,
            median_before,
            median_after,
            statistic: computation.statistic,
            p_value: computation.p_value,
            change,
            sample_size_before: filtered_before.len(),
            sample_size_after: filtered_after.len(),
            raw_before: before.to_vec(),
            raw_after: after.to_vec(),
            details,
        })
    }

    /// The rank-sum path with joint random downsampling.
    ///
    /// Downsampling introduces sampling variance a single draw would hide,
    /// so the test repeats across several draws under a capped worker pool.
    /// Aggregation is order-independent: statistic and p-value by mean,
    /// significance by strict majority vote at the configured alpha.
    async fn rank_sum_repeated(
        &self,
        before: &[f64],
        after: &[f64],
    ) -> Result<(TestComputation, bool), AnalysisError> {
        let settings = &self.downsample;
        let combined = before.len() + after.len();
        let repetitions = if combined > settings.escalate_above {
            settings.max_repetitions
        } else {
            settings.min_repetitions
        }
        .max(1);
        let needs_downsampling =
            before.len() > settings.max_array_size || after.len() > settings.max_array_size;

        if repetitions == 1 && !needs_downsampling {
            let computation = RankSumTest.compute(before, after)?;
            let significant = computation.p_value <= self.analysis.alpha;
            return Ok((computation, significant));
        }

        let semaphore = Arc::new(Semaphore::new(settings.parallelism.max(1)));
        let before = Arc::new(before.to_vec());
        let after = Arc::new(after.to_vec());
        let mut join_set = JoinSet::new();

        for repetition in 0..repetitions {
            let semaphore = semaphore.clone();
            let before = before.clone();
            let after = after.clone();
            let max_size = settings.max_array_size;
            let seed = settings.seed.map(|s| s.wrapping_add(repetition as u64));

            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return Err(AnalysisError::ExecutionFailure(
                            "downsampling worker pool closed".to_string(),
                        ))
                    }
                };
                let mut rng = match seed {
                    Some(s) => StdRng::seed_from_u64(s),
                    None => StdRng::from_entropy(),
                };
                let sampled_before = downsample(&before, max_size, &mut rng);
                let sampled_after = downsample(&after, max_size, &mut rng);
                RankSumTest.compute(&sampled_before, &sampled_after)
            });
        }

        let mut computations = Vec::with_capacity(repetitions);
        while let Some(joined) = join_set.join_next().await {
            let result = joined.map_err(|e| {
                AnalysisError::ExecutionFailure(format!("downsampling repetition panicked: {e}"))
            })?;
            computations.push(result?);
        }

        let n = computations.len() as f64;
        let statistic = computations.iter().map(|c| c.statistic).sum::<f64>() / n;
        let p_value = computations.iter().map(|c| c.p_value).sum::<f64>() / n;
        let significant_repetitions = computations
            .iter()
            .filter(|c| c.p_value <= self.analysis.alpha)
            .count();
        let significant = 2 * significant_repetitions > computations.len();

        let mut details = BTreeMap::new();
        details.insert("repetitions".to_string(), n);
        details.insert(
            "significant_repetitions".to_string(),
            significant_repetitions as f64,
        );

        Ok((
            TestComputation {
                statistic,
                p_value,
                details,
            },
            significant,
        ))
    }
}

/// Standard error of the mean.
fn standard_error(sample: &[f64], mean: f64) -> f64 {
    if sample.len() < 2 {
        return 0.0;
    }
    (sample_variance(sample, mean) / sample.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regatta_core::stats::ChangeDirection;
    use regatta_core::DescriptiveStatistics;

    fn engine(analysis: AnalysisSettings) -> DiffEngine {
        let downsample = DownsampleSettings {
            seed: Some(7),
            ..DownsampleSettings::default()
        };
        DiffEngine::new(analysis, downsample)
    }

    fn run_result(name: &str, sample: Vec<f64>) -> PerformanceRunResult {
        PerformanceRunResult {
            id: TestCaseId::new(name),
            scaling_variable: None,
            statistics: DescriptiveStatistics::compile(&[1.0, 2.0, 3.0], 0.95).unwrap(),
            outliers: None,
            raw_sample: sample,
            failure_count: 0,
            ops_per_invoke: 1,
        }
    }

    #[tokio::test]
    async fn test_near_identical_distributions_no_change() {
        let analysis = AnalysisSettings {
            test: TestKind::RankSum,
            alpha: 0.01,
            ..AnalysisSettings::default()
        };
        let before = [2.0, 3.0, 4.0, 4.0, 5.0, 5.0, 6.0, 6.0, 6.0];
        let after = [9.0, 8.0, 7.0, 6.0, 4.0, 4.0, 1.0, 2.0, 3.0, 2.0];

        let comparison = engine(analysis)
            .compare_case(&TestCaseId::new("Bench.case"), &before, &after)
            .await;
        let result = comparison.outcome.unwrap();

        assert_eq!(result.median_before, 5.0);
        assert_eq!(result.median_after, 4.0);
        assert!((result.mean_before - 41.0 / 9.0).abs() < 1e-9);
        assert!((result.mean_after - 4.6).abs() < 1e-9);
        assert!(result.p_value > 0.01);
        assert_eq!(result.change, ChangeDirection::NoChange);
        assert_eq!(result.raw_before.len(), 9);
        assert_eq!(result.raw_after.len(), 10);
    }

    #[tokio::test]
    async fn test_clear_regression_detected() {
        let analysis = AnalysisSettings {
            test: TestKind::RankSum,
            alpha: 0.05,
            ..AnalysisSettings::default()
        };
        let before: Vec<f64> = (0..30).map(|i| 10.0 + (i % 5) as f64 * 0.1).collect();
        let after: Vec<f64> = (0..30).map(|i| 20.0 + (i % 5) as f64 * 0.1).collect();

        let comparison = engine(analysis)
            .compare_case(&TestCaseId::new("Bench.case"), &before, &after)
            .await;
        let result = comparison.outcome.unwrap();

        assert_eq!(result.change, ChangeDirection::Regressed);
        // Combined size beyond the escalation bound runs the full repetition
        // count.
        assert_eq!(result.details["repetitions"], 25.0);
        assert_eq!(result.details["significant_repetitions"], 25.0);
    }

    #[tokio::test]
    async fn test_clear_improvement_detected() {
        let analysis = AnalysisSettings {
            test: TestKind::RankSum,
            alpha: 0.05,
            ..AnalysisSettings::default()
        };
        let before: Vec<f64> = (0..30).map(|i| 20.0 + (i % 5) as f64 * 0.1).collect();
        let after: Vec<f64> = (0..30).map(|i| 10.0 + (i % 5) as f64 * 0.1).collect();

        let comparison = engine(analysis)
            .compare_case(&TestCaseId::new("Bench.case"), &before, &after)
            .await;
        let result = comparison.outcome.unwrap();

        assert_eq!(result.change, ChangeDirection::Improved);
    }

    #[tokio::test]
    async fn test_signed_rank_dimension_mismatch_captured() {
        let analysis = AnalysisSettings {
            test: TestKind::SignedRank,
            ..AnalysisSettings::default()
        };
        let before = [1.0, 2.0, 3.0, 4.0, 5.0];
        let after = [1.0, 2.0, 3.0, 4.0];

        let comparison = engine(analysis)
            .compare_case(&TestCaseId::new("Bench.case"), &before, &after)
            .await;

        assert!(matches!(
            comparison.outcome,
            Err(AnalysisError::DimensionMismatch {
                before: 5,
                after: 4
            })
        ));
    }

    #[tokio::test]
    async fn test_welch_classifies_on_means() {
        let analysis = AnalysisSettings {
            test: TestKind::WelchT,
            outlier_detection: false,
            ..AnalysisSettings::default()
        };
        let before = [10.0, 10.1, 9.9, 10.05, 9.95, 10.02];
        let after = [15.0, 15.1, 14.9, 15.05, 14.95, 15.02];

        let comparison = engine(analysis)
            .compare_case(&TestCaseId::new("Bench.case"), &before, &after)
            .await;
        let result = comparison.outcome.unwrap();

        assert_eq!(result.test, TestKind::WelchT);
        assert_eq!(result.change, ChangeDirection::Regressed);
        assert!(result.details.contains_key("degrees_of_freedom"));
    }

    #[tokio::test]
    async fn test_outlier_stripping_reported_alongside_raw() {
        let analysis = AnalysisSettings {
            test: TestKind::WelchT,
            outlier_detection: true,
            ..AnalysisSettings::default()
        };
        let mut before: Vec<f64> = (0..20).map(|i| 10.0 + (i % 4) as f64 * 0.05).collect();
        before.push(500.0); // stripped by the Tukey fences
        let after: Vec<f64> = (0..20).map(|i| 10.0 + (i % 4) as f64 * 0.05).collect();

        let comparison = engine(analysis)
            .compare_case(&TestCaseId::new("Bench.case"), &before, &after)
            .await;
        let result = comparison.outcome.unwrap();

        assert_eq!(result.sample_size_before, 20);
        assert_eq!(result.raw_before.len(), 21);
        assert!(result.mean_before < 11.0);
    }

    #[tokio::test]
    async fn test_compare_runs_isolates_failures_and_adjusts() {
        let analysis = AnalysisSettings {
            test: TestKind::RankSum,
            ..AnalysisSettings::default()
        };
        let engine = engine(analysis);

        let before = vec![
            run_result("Bench.good", (0..25).map(|i| 10.0 + (i % 5) as f64).collect()),
            run_result("Bench.bad", vec![]),
            run_result("Bench.only_before", vec![1.0, 2.0, 3.0]),
        ];
        let after = vec![
            run_result("Bench.good", (0..25).map(|i| 30.0 + (i % 5) as f64).collect()),
            run_result("Bench.bad", vec![1.0, 2.0, 3.0]),
        ];

        let report = engine.compare_runs(&before, &after).await;

        assert_eq!(report.comparisons.len(), 2);
        assert_eq!(report.skipped, 1);

        let good = &report.comparisons[0];
        assert!(good.outcome.is_ok());
        let bad = &report.comparisons[1];
        assert!(matches!(bad.outcome, Err(AnalysisError::InvalidInput(_))));

        // Only the successful comparison gets a q-value, and q >= p.
        assert_eq!(report.q_values.len(), 1);
        let q = report.q_values[&TestCaseId::new("Bench.good")];
        let p = good.outcome.as_ref().unwrap().p_value;
        assert!(q >= p);
    }

    #[tokio::test]
    async fn test_seeded_downsampling_is_reproducible() {
        let analysis = AnalysisSettings {
            test: TestKind::RankSum,
            ..AnalysisSettings::default()
        };
        let downsample = DownsampleSettings {
            max_array_size: 16,
            seed: Some(99),
            ..DownsampleSettings::default()
        };
        let before: Vec<f64> = (0..200).map(|i| 10.0 + (i % 13) as f64 * 0.3).collect();
        let after: Vec<f64> = (0..200).map(|i| 10.5 + (i % 11) as f64 * 0.3).collect();

        let engine = DiffEngine::new(analysis.clone(), downsample.clone());
        let first = engine
            .compare_case(&TestCaseId::new("Bench.case"), &before, &after)
            .await
            .outcome
            .unwrap();

        let engine = DiffEngine::new(analysis, downsample);
        let second = engine
            .compare_case(&TestCaseId::new("Bench.case"), &before, &after)
            .await
            .outcome
            .unwrap();

        assert_eq!(first.statistic, second.statistic);
        assert_eq!(first.p_value, second.p_value);
    }
}
