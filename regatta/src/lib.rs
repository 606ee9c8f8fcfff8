//! regatta: statistically rigorous microbenchmarking.
//!
//! This crate is the execution half of the framework: a sampling controller
//! that times registered case bodies under fixed or adaptive policies, an
//! operations-per-invoke autotuner for sub-millisecond bodies, a comparison
//! engine that decides whether two runs differ, and the compilation glue
//! that feeds results to reporting sinks. The pure statistics live in
//! `regatta-core` and are re-exported here.

pub mod compiler;
pub mod config;
pub mod diff;
pub mod registry;
pub mod report;
pub mod sampler;

// Re-export core types for convenience
pub use regatta_core::{
    benjamini_hochberg, classify_change, detect_outliers, estimate_complexity, normalize_pair,
    ratio_ci, AnalysisError, ChangeDirection, ComplexityFunction, ComplexityMeasurement,
    ComplexityModel, DescriptiveStatistics, FitOptions, FitnessResult, FittedCurve,
    OutlierAnalysis, RatioCi, ScalingCandidate, StatisticalTestResult, TestCaseId, TestKind,
    TwoSampleTest, VariableValue,
};

// Re-export main types from this crate
pub use compiler::{
    compile_case, compile_run, estimate_scaling, run_registry, CompiledRun, PerformanceRunResult,
    RunArtifacts, ScalingReport,
};
pub use config::{
    AnalysisSettings, Config, DownsampleSettings, SamplingPolicy, SamplingSettings, TuningSettings,
};
pub use diff::{CaseComparison, ComparisonReport, DiffEngine};
pub use registry::{
    CaseBody, CaseDescriptor, CaseDescriptorBuilder, CaseHook, CaseRegistry, RegistryError,
};
pub use report::{ReportError, Reporter, TerminalReporter};
pub use sampler::{
    consume, tune_ops, CancelToken, FailureStage, IterationFailure, SamplerError,
    SamplingController, SamplingOutcome,
};
