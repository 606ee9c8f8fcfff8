//! Configuration loading for regatta.
//!
//! Supports loading configuration from TOML files, with sensible defaults
//! for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use regatta_core::TestKind;

/// Top-level configuration for regatta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Settings for the sampling controller.
    pub sampling: SamplingSettings,
    /// Settings for statistical analysis and comparison.
    pub analysis: AnalysisSettings,
    /// Settings for the rank-sum downsampling repetition loop.
    pub downsample: DownsampleSettings,
    /// Settings for the operations-per-invoke autotuner.
    pub tuning: TuningSettings,
}

/// How the sampling controller decides when enough samples are collected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplingPolicy {
    /// Run a warmup phase, then exactly `sample_size` measured iterations.
    #[default]
    Fixed,
    /// Run measured iterations in batches until the coefficient of variation
    /// drops below `target_cv`, capped at `max_sample_size`.
    Adaptive,
}

/// Configuration for the sampling controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    pub policy: SamplingPolicy,
    /// Number of measured iterations under the fixed policy.
    pub sample_size: usize,
    /// Untimed iterations discarded before measurement begins.
    pub warmup_iterations: usize,
    /// Iterations per batch under the adaptive policy.
    pub batch_size: usize,
    /// Adaptive policy stops once stddev / mean drops to this value.
    pub target_cv: f64,
    /// Hard cap on measured iterations; guarantees adaptive termination.
    pub max_sample_size: usize,
}

/// Configuration for statistical analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Which two-sample test to run for before/after comparisons.
    pub test: TestKind,
    /// Significance threshold for a single comparison.
    pub alpha: f64,
    /// Confidence level for descriptive-statistics intervals.
    pub confidence_level: f64,
    /// Strip Tukey-fence outliers before computing statistics.
    pub outlier_detection: bool,
    /// Significant digits applied by reporters; never inside the pipeline.
    pub round_digits: usize,
}

/// Configuration for the Mann-Whitney repeated-downsampling loop.
///
/// The repetition and escalation constants are empirically tuned rather than
/// derived, which is why they are settings and not hard-coded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownsampleSettings {
    /// Each side of the comparison is randomly reduced to at most this many
    /// observations per repetition.
    pub max_array_size: usize,
    /// Combined sample sizes above this escalate from `min_repetitions` to
    /// `max_repetitions`.
    pub escalate_above: usize,
    pub min_repetitions: usize,
    pub max_repetitions: usize,
    /// Worker-pool cap for concurrent repetitions.
    pub parallelism: usize,
    /// Seed for reproducible downsampling; fresh entropy when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Configuration for the operations-per-invoke autotuner, used when a single
/// operation is too fast to time accurately on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningSettings {
    pub enabled: bool,
    /// Target duration of one timed invocation, in milliseconds.
    pub target_invoke_ms: f64,
    /// Untimed priming runs before the single-operation probes.
    pub probe_warmups: usize,
    /// Single-operation probe timings; the median seeds the estimate.
    pub probe_samples: usize,
    /// Proportional-adjustment passes after the initial estimate.
    pub max_refinements: usize,
    pub max_ops_per_invoke: u64,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            policy: SamplingPolicy::Fixed,
            sample_size: 100,
            warmup_iterations: 3,
            batch_size: 10,
            target_cv: 0.05,
            max_sample_size: 500,
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            test: TestKind::RankSum,
            alpha: 0.05,
            confidence_level: 0.95,
            outlier_detection: true,
            round_digits: 4,
        }
    }
}

impl Default for DownsampleSettings {
    fn default() -> Self {
        Self {
            max_array_size: 1024,
            escalate_above: 20,
            min_repetitions: 1,
            max_repetitions: 25,
            parallelism: 5,
            seed: None,
        }
    }
}

impl Default for TuningSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            target_invoke_ms: 50.0,
            probe_warmups: 3,
            probe_samples: 5,
            max_refinements: 5,
            max_ops_per_invoke: 1_000_000,
        }
    }
}

/// Default configuration file name.
const DEFAULT_CONFIG_FILE: &str = ".regatta.toml";

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from the default file (`.regatta.toml`) or use
    /// defaults.
    ///
    /// This function searches for the configuration file in the current
    /// directory. If the file doesn't exist, default configuration is
    /// returned. If the file exists but cannot be parsed, an error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be parsed.
    pub fn load_or_default() -> Result<Config> {
        let path = Path::new(DEFAULT_CONFIG_FILE);

        if path.exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from the specified path, or try default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the specified file cannot be read or parsed.
    pub fn load_from(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(p) => Self::load(p),
            None => Self::load_or_default(),
        }
    }
}
