//! Result compilation and orchestration glue.
//!
//! Turns raw sampling outcomes into the per-case summary structures consumed
//! by the comparison engine and the reporting sinks, groups scaling
//! measurements per (method, variable), and drives a whole registry through
//! the sampling controller. Per-case failures are captured, never allowed to
//! abort the rest of a run.

use std::collections::BTreeMap;

use serde::Serialize;

use regatta_core::complexity::{estimate_complexity, ComplexityMeasurement, ComplexityModel};
use regatta_core::stats::{detect_outliers, DescriptiveStatistics, OutlierAnalysis};
use regatta_core::{AnalysisError, FitOptions, TestCaseId};

use crate::config::{AnalysisSettings, Config};
use crate::registry::CaseRegistry;
use crate::sampler::{
    CancelToken, FailureStage, IterationFailure, SamplerError, SamplingController, SamplingOutcome,
};

/// Per-case summary of one run, handed to comparison and reporting.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceRunResult {
    pub id: TestCaseId,
    /// Scaling dimension, when this case participates in complexity
    /// estimation.
    pub scaling_variable: Option<String>,
    /// Statistics over the (possibly outlier-stripped) population.
    pub statistics: DescriptiveStatistics,
    /// Outlier breakdown, present when stripping was enabled.
    pub outliers: Option<OutlierAnalysis>,
    /// The unfiltered sample, retained for downstream tests.
    pub raw_sample: Vec<f64>,
    pub failure_count: usize,
    pub ops_per_invoke: u64,
}

/// A compiled run: per-case summaries plus the cases that failed to compile.
#[derive(Debug, Clone, Default)]
pub struct CompiledRun {
    pub results: Vec<PerformanceRunResult>,
    pub failures: Vec<(TestCaseId, AnalysisError)>,
}

/// Compile one sampling outcome into its run summary.
///
/// # Errors
///
/// `ExecutionFailure` when no iteration succeeded; otherwise whatever the
/// statistics compiler raises for the surviving population.
pub fn compile_case(
    outcome: &SamplingOutcome,
    settings: &AnalysisSettings,
) -> Result<PerformanceRunResult, AnalysisError> {
    if outcome.sample.is_empty() {
        let detail = outcome
            .failures
            .last()
            .map(|f| f.message.clone())
            .unwrap_or_else(|| "no iterations were recorded".to_string());
        return Err(AnalysisError::ExecutionFailure(format!(
            "no successful iterations ({} failures): {}",
            outcome.failures.len(),
            detail
        )));
    }

    let (outliers, population) = if settings.outlier_detection {
        let analysis = detect_outliers(&outcome.sample)?;
        let population = analysis.data_with_outliers_removed.clone();
        (Some(analysis), population)
    } else {
        (None, outcome.sample.clone())
    };

    let statistics = DescriptiveStatistics::compile(&population, settings.confidence_level)?;

    Ok(PerformanceRunResult {
        id: outcome.id.clone(),
        scaling_variable: outcome.scaling_variable.clone(),
        statistics,
        outliers,
        raw_sample: outcome.sample.clone(),
        failure_count: outcome.failures.len(),
        ops_per_invoke: outcome.ops_per_invoke,
    })
}

/// Compile a whole run, isolating per-case failures.
pub fn compile_run(outcomes: &[SamplingOutcome], settings: &AnalysisSettings) -> CompiledRun {
    let mut run = CompiledRun::default();
    for outcome in outcomes {
        match compile_case(outcome, settings) {
            Ok(result) => run.results.push(result),
            Err(error) => run.failures.push((outcome.id.clone(), error)),
        }
    }
    run
}

/// Complexity estimate for one (method, scaling variable) group.
#[derive(Debug, Clone)]
pub struct ScalingReport {
    pub method: String,
    pub variable: String,
    /// The (input size, mean duration) observations the fit ran against.
    pub measurements: Vec<ComplexityMeasurement>,
    pub outcome: Result<ComplexityModel, AnalysisError>,
}

/// Group per-case mean durations by (method, scaling variable) and run the
/// complexity estimator on each group. Groups that cannot be estimated carry
/// their error; they never abort the others.
pub fn estimate_scaling(
    results: &[PerformanceRunResult],
    options: &FitOptions,
) -> Vec<ScalingReport> {
    let mut groups: BTreeMap<(String, String), Vec<ComplexityMeasurement>> = BTreeMap::new();

    for result in results {
        let Some(variable) = &result.scaling_variable else {
            continue;
        };
        let Some(value) = result.id.variable(variable) else {
            continue;
        };
        groups
            .entry((result.id.method().to_string(), variable.clone()))
            .or_default()
            .push(ComplexityMeasurement::new(
                value as f64,
                result.statistics.mean,
            ));
    }

    groups
        .into_iter()
        .map(|((method, variable), measurements)| {
            let outcome = estimate_complexity(&measurements, options);
            ScalingReport {
                method,
                variable,
                measurements,
                outcome,
            }
        })
        .collect()
}

/// Everything one run produces.
#[derive(Debug)]
pub struct RunArtifacts {
    pub run: CompiledRun,
    pub scaling: Vec<ScalingReport>,
}

/// Sample every registered case sequentially and compile the results.
///
/// Timed bodies never run concurrently with each other; exclusive use of the
/// timer during a measured iteration is what keeps samples clean. A case
/// that fails deterministically is recorded in the compiled run's failures
/// and the remaining cases still execute.
///
/// # Errors
///
/// Only cancellation aborts the whole run.
pub async fn run_registry(
    registry: &CaseRegistry,
    config: &Config,
    token: &CancelToken,
) -> Result<RunArtifacts, SamplerError> {
    let controller = SamplingController::new(config.sampling.clone(), config.tuning.clone());

    let mut outcomes = Vec::with_capacity(registry.len());
    for case in registry.iter() {
        match controller.run(case, token).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(SamplerError::Cancelled) => return Err(SamplerError::Cancelled),
            Err(SamplerError::DeterministicFailure(message)) => {
                // Captured as an empty outcome so compilation reports it per
                // case.
                outcomes.push(SamplingOutcome {
                    id: case.id().clone(),
                    scaling_variable: case.scaling_variable().map(str::to_string),
                    sample: Vec::new(),
                    failures: vec![IterationFailure {
                        iteration: 0,
                        stage: FailureStage::Invocation,
                        message,
                    }],
                    ops_per_invoke: 1,
                });
            }
        }
    }

    let run = compile_run(&outcomes, &config.analysis);
    let scaling = estimate_scaling(&run.results, &FitOptions::default());

    Ok(RunArtifacts { run, scaling })
}
