use std::io::{self, Write};

use colored::Colorize;

use regatta_core::stats::ChangeDirection;

use super::{ReportError, Reporter};
use crate::compiler::{PerformanceRunResult, ScalingReport};
use crate::diff::ComparisonReport;

/// A reporter that renders results as terminal tables.
#[derive(Debug, Clone)]
pub struct TerminalReporter {
    /// Whether to use colors in output (defaults to true).
    use_colors: bool,
    /// Significant digits applied to displayed values.
    round_digits: usize,
}

impl TerminalReporter {
    /// Create a terminal reporter rounding to the given significant digits.
    pub fn new(round_digits: usize) -> Self {
        Self {
            use_colors: true,
            round_digits,
        }
    }

    /// Create a terminal reporter with color output disabled.
    pub fn without_colors(round_digits: usize) -> Self {
        Self {
            use_colors: false,
            round_digits,
        }
    }

    /// Round to the configured number of significant digits.
    fn round(&self, value: f64) -> f64 {
        round_significant(value, self.round_digits)
    }

    fn format_verdict(&self, change: ChangeDirection) -> String {
        match change {
            ChangeDirection::Regressed => {
                let text = "regressed";
                if self.use_colors {
                    text.red().bold().to_string()
                } else {
                    text.to_string()
                }
            }
            ChangeDirection::Improved => {
                let text = "improved";
                if self.use_colors {
                    text.green().bold().to_string()
                } else {
                    text.to_string()
                }
            }
            ChangeDirection::NoChange => {
                let text = "no change";
                if self.use_colors {
                    text.yellow().to_string()
                } else {
                    text.to_string()
                }
            }
        }
    }

    fn write_run(
        &self,
        writer: &mut impl Write,
        results: &[PerformanceRunResult],
    ) -> io::Result<()> {
        writeln!(
            writer,
            "{:<48} {:>12} {:>12} {:>12} {:>8} {:>10}",
            "Case", "Mean (ms)", "Median (ms)", "StdDev (ms)", "N", "Outliers"
        )?;
        writeln!(writer, "{}", "-".repeat(108))?;

        for result in results {
            let stats = &result.statistics;
            let outliers = result
                .outliers
                .as_ref()
                .map(|o| o.total_outliers())
                .unwrap_or(0);
            writeln!(
                writer,
                "{:<48} {:>12} {:>12} {:>12} {:>8} {:>10}",
                result.id.to_string(),
                self.round(stats.mean),
                self.round(stats.median),
                self.round(stats.std_dev),
                stats.sample_size,
                outliers
            )?;
        }
        Ok(())
    }

    fn write_comparison(
        &self,
        writer: &mut impl Write,
        report: &ComparisonReport,
    ) -> io::Result<()> {
        writeln!(
            writer,
            "{:<48} {:>12} {:>12} {:>10} {:>10} {:>12}",
            "Case", "Before (ms)", "After (ms)", "p-value", "q-value", "Verdict"
        )?;
        writeln!(writer, "{}", "-".repeat(110))?;

        for comparison in &report.comparisons {
            match &comparison.outcome {
                Ok(result) => {
                    let q = report
                        .q_values
                        .get(&comparison.id)
                        .map(|q| self.round(*q).to_string())
                        .unwrap_or_else(|| "-".to_string());
                    writeln!(
                        writer,
                        "{:<48} {:>12} {:>12} {:>10} {:>10} {:>12}",
                        comparison.id.to_string(),
                        self.round(result.mean_before),
                        self.round(result.mean_after),
                        self.round(result.p_value),
                        q,
                        self.format_verdict(result.change)
                    )?;
                }
                Err(error) => {
                    let label = "failed to analyze";
                    let label = if self.use_colors {
                        label.red().to_string()
                    } else {
                        label.to_string()
                    };
                    writeln!(
                        writer,
                        "{:<48} {}: {}",
                        comparison.id.to_string(),
                        label,
                        error
                    )?;
                }
            }
        }

        if report.skipped > 0 {
            writeln!(
                writer,
                "({} case(s) present in only one run were skipped)",
                report.skipped
            )?;
        }
        Ok(())
    }

    fn write_scaling(&self, writer: &mut impl Write, reports: &[ScalingReport]) -> io::Result<()> {
        writeln!(
            writer,
            "{:<40} {:>10} {:>14} {:>10} {:>14}",
            "Method", "Variable", "Best fit", "R^2", "Second"
        )?;
        writeln!(writer, "{}", "-".repeat(92))?;

        for report in reports {
            match &report.outcome {
                Ok(model) => {
                    let secondary = model
                        .secondary
                        .as_ref()
                        .map(|s| s.function().big_o())
                        .unwrap_or("-");
                    writeln!(
                        writer,
                        "{:<40} {:>10} {:>14} {:>10} {:>14}",
                        report.method,
                        report.variable,
                        model.primary.function().big_o(),
                        self.round(model.primary.fitness.r_squared),
                        secondary
                    )?;
                }
                Err(error) => {
                    writeln!(
                        writer,
                        "{:<40} {:>10} could not estimate: {}",
                        report.method, report.variable, error
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl Reporter for TerminalReporter {
    fn report_run(&self, results: &[PerformanceRunResult]) -> Result<(), ReportError> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        self.write_run(&mut handle, results)?;
        Ok(())
    }

    fn report_comparison(&self, report: &ComparisonReport) -> Result<(), ReportError> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        self.write_comparison(&mut handle, report)?;
        Ok(())
    }

    fn report_scaling(&self, reports: &[ScalingReport]) -> Result<(), ReportError> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        self.write_scaling(&mut handle, reports)?;
        Ok(())
    }
}

/// Round `value` to `digits` significant digits.
fn round_significant(value: f64, digits: usize) -> f64 {
    if value == 0.0 || !value.is_finite() || digits == 0 {
        return value;
    }
    let magnitude = value.abs().log10().floor();
    let factor = 10f64.powf(digits as f64 - 1.0 - magnitude);
    (value * factor).round() / factor
}
