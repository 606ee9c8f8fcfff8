//! Reporting sinks.
//!
//! The core publishes run summaries, comparison verdicts and scaling models
//! through the [`Reporter`] trait; how they are persisted or rendered is the
//! sink's concern. Significant-digit rounding happens in reporters and
//! nowhere else in the pipeline.

use thiserror::Error;

use crate::compiler::{PerformanceRunResult, ScalingReport};
use crate::diff::ComparisonReport;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A sink for structured analysis results.
pub trait Reporter: Send + Sync {
    /// Publish the per-case summaries of one run.
    fn report_run(&self, results: &[PerformanceRunResult]) -> Result<(), ReportError>;

    /// Publish a before/after comparison batch.
    fn report_comparison(&self, report: &ComparisonReport) -> Result<(), ReportError>;

    /// Publish complexity models.
    fn report_scaling(&self, reports: &[ScalingReport]) -> Result<(), ReportError>;
}

mod terminal;
pub use terminal::TerminalReporter;
