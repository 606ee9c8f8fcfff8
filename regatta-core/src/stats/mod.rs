//! Two-sample statistical testing primitives.
//!
//! Each test implements [`TwoSampleTest`] over plain `f64` duration samples
//! (milliseconds). The tests are pure: preprocessing policy (outlier
//! stripping, downsampling, pairing) is decided by the comparison engine that
//! calls them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

pub mod descriptive;
pub mod downsample;
pub mod ks;
pub mod outliers;
mod rank;
pub mod rank_sum;
pub mod signed_rank;
pub mod ttest;

pub use descriptive::{mean, median, sample_variance, ConfidenceInterval, DescriptiveStatistics};
pub use downsample::downsample;
pub use ks::KolmogorovSmirnovTest;
pub use outliers::{detect_outliers, OutlierAnalysis};
pub use rank_sum::RankSumTest;
pub use signed_rank::SignedRankTest;
pub use ttest::WelchTTest;

/// Which hypothesis test to run for a before/after comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    /// Welch's two-sample t-test; appropriate when samples are approximately
    /// normal.
    WelchT,
    /// Mann-Whitney/Wilcoxon rank-sum; unpaired, no normality assumption.
    #[default]
    RankSum,
    /// Wilcoxon signed-rank over paired samples of equal length.
    SignedRank,
    /// Two-sample Kolmogorov-Smirnov; compares whole distributions rather
    /// than location alone.
    KolmogorovSmirnov,
}

impl TestKind {
    /// Human-readable test name.
    pub fn name(&self) -> &'static str {
        match self {
            TestKind::WelchT => "Welch t-test",
            TestKind::RankSum => "Wilcoxon rank-sum",
            TestKind::SignedRank => "Wilcoxon signed-rank",
            TestKind::KolmogorovSmirnov => "Kolmogorov-Smirnov",
        }
    }

    /// Whether change classification compares means (Welch) or medians (the
    /// rank and distribution tests).
    pub fn classifies_on_mean(&self) -> bool {
        matches!(self, TestKind::WelchT)
    }

    /// The implementation behind this kind.
    pub fn test(&self) -> &'static dyn TwoSampleTest {
        match self {
            TestKind::WelchT => &WelchTTest,
            TestKind::RankSum => &RankSumTest,
            TestKind::SignedRank => &SignedRankTest,
            TestKind::KolmogorovSmirnov => &KolmogorovSmirnovTest,
        }
    }
}

/// Direction of the distribution shift from "before" to "after".
///
/// Durations are being compared, so a shift upward is a regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeDirection {
    Regressed,
    Improved,
    NoChange,
}

/// Statistic and p-value from one test computation, plus test-specific side
/// values (degrees of freedom, z-scores, repetition counts, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestComputation {
    pub statistic: f64,
    pub p_value: f64,
    pub details: BTreeMap<String, f64>,
}

/// A two-sample hypothesis test over before/after timing samples.
pub trait TwoSampleTest: Send + Sync {
    fn kind(&self) -> TestKind;

    /// Compute the test statistic and two-sided p-value.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for empty samples, `InsufficientData` when the sample
    /// is too small for the statistic, `DimensionMismatch` for paired tests
    /// fed unequal lengths.
    fn compute(&self, before: &[f64], after: &[f64]) -> Result<TestComputation, AnalysisError>;
}

/// Full outcome of one before/after comparison for a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalTestResult {
    pub test: TestKind,
    pub mean_before: f64,
    pub mean_after: f64,
    pub median_before: f64,
    pub median_after: f64,
    pub statistic: f64,
    pub p_value: f64,
    pub change: ChangeDirection,
    pub sample_size_before: usize,
    pub sample_size_after: usize,
    /// Unfiltered raw samples, retained even when outlier stripping was
    /// applied before the statistic.
    pub raw_before: Vec<f64>,
    pub raw_after: Vec<f64>,
    pub details: BTreeMap<String, f64>,
}

/// Classify the shift between two location statistics.
///
/// `Regressed` when the "after" location exceeds "before" and the test was
/// significant; `Improved` for a significant drop; `NoChange` otherwise.
/// Significance is decided by the caller: `p <= alpha` for a single
/// computation, or a majority vote across downsampling repetitions.
pub fn classify_change(
    significant: bool,
    location_before: f64,
    location_after: f64,
) -> ChangeDirection {
    if !significant {
        return ChangeDirection::NoChange;
    }
    if location_after > location_before {
        ChangeDirection::Regressed
    } else if location_after < location_before {
        ChangeDirection::Improved
    } else {
        ChangeDirection::NoChange
    }
}
