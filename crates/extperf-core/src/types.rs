//! Run configuration for a single sweep

use crate::error::{Error, Result};
use crate::qualifier::Qualifier;

/// Default number of samples per trial
pub const DEFAULT_RUNS: u32 = 7;

/// Smallest sample count that still yields a standard deviation
pub const MIN_RUNS: u32 = 2;

/// Label printed for the trial without any added extension
pub const BASELINE_LABEL: &str = "baseline";

/// Options for one sweep, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Samples the measurement utility takes per trial
    pub runs: u32,

    /// Baseline mean in seconds; skips the baseline trial when set
    pub base_time: Option<f64>,

    /// Explicit extension list; empty means discover from the packages directory
    pub extensions: Vec<Qualifier>,

    /// Run the full install+build instead of the incremental build
    pub full_build: bool,

    /// Override for the URL the application is measured at
    pub url: Option<String>,
}

impl RunConfig {
    /// Validate and build a run configuration
    pub fn new(
        runs: u32,
        base_time: Option<f64>,
        extensions: Vec<Qualifier>,
        full_build: bool,
        url: Option<String>,
    ) -> Result<Self> {
        if runs < MIN_RUNS {
            return Err(Error::invalid_config(format!(
                "--runs must be at least {}",
                MIN_RUNS
            )));
        }

        if let Some(base) = base_time {
            if !base.is_finite() {
                return Err(Error::invalid_config("--base-time must be a finite number"));
            }
        }

        Ok(Self {
            runs,
            base_time,
            extensions,
            full_build,
            url,
        })
    }

    /// Parse raw qualifier strings, failing on the first malformed entry
    pub fn parse_extensions<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Qualifier>> {
        raw.iter().map(|s| Qualifier::parse(s.as_ref())).collect()
    }
}
