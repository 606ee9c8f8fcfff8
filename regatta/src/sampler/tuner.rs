//! Operations-per-invoke autotuning.
//!
//! Sub-millisecond bodies are too fast to time accurately one operation at a
//! time, so the controller batches `ops` operations inside each timed
//! invocation. The tuner estimates `ops` from a median of single-operation
//! probes and refines it with proportional-adjustment passes until the
//! invocation duration lands within 20% of the target.

use regatta_core::stats::median;

use super::{run_iteration, CancelToken, SamplerError};
use crate::config::TuningSettings;
use crate::registry::CaseDescriptor;

/// Accept the current estimate once the measured invocation duration is
/// within this fraction of the target on either side.
const ACCEPT_TOLERANCE: f64 = 0.2;

/// Estimate how many operations one timed invocation should run.
///
/// # Errors
///
/// `Cancelled` when the token fires between probes; `DeterministicFailure`
/// when every probe invocation fails.
pub async fn tune_ops(
    case: &CaseDescriptor,
    settings: &TuningSettings,
    token: &CancelToken,
) -> Result<u64, SamplerError> {
    // Priming runs so the probes measure steady-state behavior.
    for _ in 0..settings.probe_warmups {
        if token.is_cancelled() {
            return Err(SamplerError::Cancelled);
        }
        let _ = run_iteration(case, 1).await;
    }

    let mut probes = Vec::with_capacity(settings.probe_samples);
    for _ in 0..settings.probe_samples {
        if token.is_cancelled() {
            return Err(SamplerError::Cancelled);
        }
        if let Ok(duration_ms) = run_iteration(case, 1).await {
            probes.push(duration_ms);
        }
    }
    if probes.is_empty() {
        return Err(SamplerError::DeterministicFailure(
            "every tuning probe failed".to_string(),
        ));
    }

    let single_op_ms = median(&probes);
    let mut ops = initial_estimate(single_op_ms, settings);

    for _ in 0..settings.max_refinements {
        if token.is_cancelled() {
            return Err(SamplerError::Cancelled);
        }
        // A failed refinement invocation keeps the current estimate.
        let Ok(per_op_ms) = run_iteration(case, ops).await else {
            break;
        };

        let invoke_ms = per_op_ms * ops as f64;
        if (invoke_ms - settings.target_invoke_ms).abs()
            <= ACCEPT_TOLERANCE * settings.target_invoke_ms
        {
            break;
        }

        let adjusted = ops as f64 * settings.target_invoke_ms / invoke_ms;
        ops = clamp_ops(adjusted, settings.max_ops_per_invoke);
    }

    Ok(ops)
}

/// Initial estimate from the median single-operation duration. A duration at
/// or below clock resolution maxes the batch out.
pub(crate) fn initial_estimate(single_op_ms: f64, settings: &TuningSettings) -> u64 {
    if single_op_ms <= 0.0 {
        return settings.max_ops_per_invoke;
    }
    clamp_ops(
        (settings.target_invoke_ms / single_op_ms).ceil(),
        settings.max_ops_per_invoke,
    )
}

fn clamp_ops(ops: f64, max_ops: u64) -> u64 {
    if !ops.is_finite() {
        return max_ops;
    }
    (ops.round() as i64).clamp(1, max_ops as i64) as u64
}
