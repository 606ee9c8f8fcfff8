//! Statistical analysis core for regatta.
//!
//! This crate is the pure half of the framework: descriptive statistics and
//! outlier detection over timing samples, two-sample hypothesis tests for
//! before/after comparisons, batch-level false-discovery-rate correction,
//! and empirical complexity-curve fitting. Execution concerns (sampling,
//! scheduling, reporting) live in the `regatta` crate.

pub mod complexity;
pub mod correction;
pub mod error;
pub mod id;
pub mod stats;

// Re-export main types for convenience
pub use complexity::{
    estimate_complexity, ComplexityFunction, ComplexityMeasurement, ComplexityModel, FitOptions,
    FitnessResult, FittedCurve, ScalingCandidate,
};
pub use correction::{benjamini_hochberg, normalize_pair, ratio_ci, RatioCi};
pub use error::AnalysisError;
pub use id::{TestCaseId, VariableValue};
pub use stats::{
    classify_change, detect_outliers, downsample, ChangeDirection, ConfidenceInterval,
    DescriptiveStatistics,
    KolmogorovSmirnovTest, OutlierAnalysis, RankSumTest, SignedRankTest, StatisticalTestResult,
    TestComputation, TestKind, TwoSampleTest, WelchTTest,
};
