//! The sampling controller.
//!
//! Executes a case body repeatedly and produces timing samples under one of
//! two policies: fixed (warmup + exactly `sample_size` measured iterations)
//! or adaptive (batches until the coefficient of variation converges, hard
//! capped at `max_sample_size`). Timed bodies run sequentially; wall-clock
//! time is measured across the full async completion of the body.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use regatta_core::stats::{mean, sample_variance};
use regatta_core::TestCaseId;

use crate::config::{SamplingPolicy, SamplingSettings, TuningSettings};
use crate::registry::CaseDescriptor;

mod blackhole;
mod tuner;

pub use blackhole::consume;
pub use tuner::tune_ops;

/// Consecutive leading failures after which collection aborts: a body that
/// fails before producing a single duration is failing deterministically.
const DETERMINISTIC_FAILURE_LIMIT: usize = 3;

/// Cooperative cancellation signal.
///
/// Checked between iterations only, never mid-iteration, so a cancelled run
/// can never record a truncated duration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The sampling loop stops before its next
    /// iteration.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Errors that can occur during sampling.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// Cancellation was requested; no partial sample is fabricated.
    #[error("Sampling cancelled")]
    Cancelled,

    /// The case body failed on every early iteration.
    #[error("Case body failed deterministically: {0}")]
    DeterministicFailure(String),
}

/// Where in the iteration lifecycle a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Setup,
    Invocation,
    Teardown,
}

/// One failed iteration, excluded from the statistical population.
#[derive(Debug, Clone)]
pub struct IterationFailure {
    pub iteration: usize,
    pub stage: FailureStage,
    pub message: String,
}

/// Timing samples collected for one case.
#[derive(Debug, Clone)]
pub struct SamplingOutcome {
    pub id: TestCaseId,
    /// Scaling dimension carried over from the descriptor for the compiler.
    pub scaling_variable: Option<String>,
    /// Per-operation durations in milliseconds; successful iterations only.
    pub sample: Vec<f64>,
    pub failures: Vec<IterationFailure>,
    pub ops_per_invoke: u64,
}

/// Executes case bodies and collects timing samples.
pub struct SamplingController {
    sampling: SamplingSettings,
    tuning: TuningSettings,
}

impl SamplingController {
    pub fn new(sampling: SamplingSettings, tuning: TuningSettings) -> Self {
        Self { sampling, tuning }
    }

    /// Run one case to completion under the configured policy.
    ///
    /// Iteration ordering is setup hook, timed invocation, teardown hook. A
    /// failing iteration is recorded and contributes no duration; it never
    /// injects a zero or garbage value into the sample.
    ///
    /// # Errors
    ///
    /// `Cancelled` when the token fires between iterations;
    /// `DeterministicFailure` when the body fails on every early iteration.
    pub async fn run(
        &self,
        case: &CaseDescriptor,
        token: &CancelToken,
    ) -> Result<SamplingOutcome, SamplerError> {
        let ops = if self.tuning.enabled {
            tuner::tune_ops(case, &self.tuning, token).await?
        } else {
            1
        };

        // Warmup phase: identical iterations, results discarded.
        for _ in 0..self.sampling.warmup_iterations {
            if token.is_cancelled() {
                return Err(SamplerError::Cancelled);
            }
            let _ = run_iteration(case, ops).await;
        }

        let mut sample = Vec::new();
        let mut failures = Vec::new();

        match self.sampling.policy {
            SamplingPolicy::Fixed => {
                for iteration in 0..self.sampling.sample_size {
                    if token.is_cancelled() {
                        return Err(SamplerError::Cancelled);
                    }
                    self.measure_one(case, ops, iteration, &mut sample, &mut failures)
                        .await?;
                }
            }
            SamplingPolicy::Adaptive => {
                let batch_size = self.sampling.batch_size.max(1);
                let mut iteration = 0;
                while iteration < self.sampling.max_sample_size {
                    let batch_end = (iteration + batch_size).min(self.sampling.max_sample_size);
                    while iteration < batch_end {
                        if token.is_cancelled() {
                            return Err(SamplerError::Cancelled);
                        }
                        self.measure_one(case, ops, iteration, &mut sample, &mut failures)
                            .await?;
                        iteration += 1;
                    }

                    let converged = coefficient_of_variation(&sample)
                        .map(|cv| cv <= self.sampling.target_cv)
                        .unwrap_or(false);
                    if converged {
                        break;
                    }
                }
            }
        }

        Ok(SamplingOutcome {
            id: case.id().clone(),
            scaling_variable: case.scaling_variable().map(str::to_string),
            sample,
            failures,
            ops_per_invoke: ops,
        })
    }

    async fn measure_one(
        &self,
        case: &CaseDescriptor,
        ops: u64,
        iteration: usize,
        sample: &mut Vec<f64>,
        failures: &mut Vec<IterationFailure>,
    ) -> Result<(), SamplerError> {
        match run_iteration(case, ops).await {
            Ok(duration_ms) => sample.push(duration_ms),
            Err((stage, message)) => {
                failures.push(IterationFailure {
                    iteration,
                    stage,
                    message: message.clone(),
                });
                if sample.is_empty() && failures.len() >= DETERMINISTIC_FAILURE_LIMIT {
                    return Err(SamplerError::DeterministicFailure(message));
                }
            }
        }
        Ok(())
    }
}

/// Run one full iteration: setup, timed invocation of `ops` operations,
/// teardown. Returns the per-operation duration in milliseconds.
pub(crate) async fn run_iteration(
    case: &CaseDescriptor,
    ops: u64,
) -> Result<f64, (FailureStage, String)> {
    if let Some(setup) = &case.iteration_setup {
        setup().map_err(|e| (FailureStage::Setup, format!("{:#}", e)))?;
    }

    let start = Instant::now();
    for _ in 0..ops {
        if let Err(e) = (case.body)().await {
            // Teardown still runs so case state is not left dangling.
            if let Some(teardown) = &case.iteration_teardown {
                let _ = teardown();
            }
            return Err((FailureStage::Invocation, format!("{:#}", e)));
        }
    }
    let elapsed_ms = start.elapsed().as_secs_f64() * 1_000.0;

    if let Some(teardown) = &case.iteration_teardown {
        teardown().map_err(|e| (FailureStage::Teardown, format!("{:#}", e)))?;
    }

    Ok(elapsed_ms / ops as f64)
}

/// stddev / mean of the collected sample; `None` until two observations
/// exist or when the mean is zero.
fn coefficient_of_variation(sample: &[f64]) -> Option<f64> {
    if sample.len() < 2 {
        return None;
    }
    let m = mean(sample);
    if m == 0.0 {
        return None;
    }
    Some(sample_variance(sample, m).sqrt() / m)
}
