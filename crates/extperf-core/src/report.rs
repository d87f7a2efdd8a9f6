//! CSV-style report rows

use std::fmt;

use crate::parser::MeasurementSample;

/// Printed for a value that does not apply to the row
pub const PLACEHOLDER: &str = "-";

/// Printed in the mean column when the measurement failed
pub const ERROR_PLACEHOLDER: &str = "error";

/// One line of the report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub label: String,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub cv_percent: Option<f64>,
    pub delta: Option<f64>,
    /// Measurement failed; the row prints an error marker
    pub failed: bool,
}

impl ReportRow {
    fn failed(label: &str) -> Self {
        Self {
            label: label.to_string(),
            mean: None,
            std_dev: None,
            cv_percent: None,
            delta: None,
            failed: true,
        }
    }
}

fn cell(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.3}", v))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

impl fmt::Display for ReportRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed {
            return write!(
                f,
                "{}, {}, {}, {}, {}",
                self.label, ERROR_PLACEHOLDER, PLACEHOLDER, PLACEHOLDER, PLACEHOLDER
            );
        }
        write!(
            f,
            "{}, {}, {}, {}, {}",
            self.label,
            cell(self.mean),
            cell(self.std_dev),
            cell(self.cv_percent),
            cell(self.delta)
        )
    }
}

/// Turns samples into rows, tracking the baseline mean
#[derive(Debug, Clone)]
pub struct ReportEmitter {
    runs: u32,
    baseline: Option<f64>,
}

impl ReportEmitter {
    /// `baseline` is the externally supplied baseline mean, if any
    pub fn new(runs: u32, baseline: Option<f64>) -> Self {
        Self { runs, baseline }
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    pub fn header(&self) -> String {
        format!(
            "Extension Name, Mean ({} runs) (in s), Std Dev (in s), CV (%), Delta (in s)",
            self.runs
        )
    }

    /// Row standing in for the skipped baseline trial when a base time was given
    pub fn supplied_baseline_row(label: &str, base_time: f64) -> ReportRow {
        ReportRow {
            label: label.to_string(),
            mean: Some(base_time),
            std_dev: None,
            cv_percent: None,
            delta: None,
            failed: false,
        }
    }

    /// Build the row for one trial.
    ///
    /// Without a baseline yet, the first valid mean becomes the baseline and
    /// its own row has no delta.
    pub fn row(&mut self, label: &str, sample: MeasurementSample) -> ReportRow {
        if !sample.is_valid() {
            return ReportRow::failed(label);
        }

        let cv_percent = if sample.mean == 0.0 {
            None
        } else {
            Some(sample.std_dev / sample.mean * 100.0)
        };
        let delta = match self.baseline {
            Some(base) => Some(sample.mean - base),
            None => {
                self.baseline = Some(sample.mean);
                None
            }
        };

        ReportRow {
            label: label.to_string(),
            mean: Some(sample.mean),
            std_dev: Some(sample.std_dev),
            cv_percent,
            delta,
            failed: false,
        }
    }
}
