//! Measurement output scraping
//!
//! The measurement utility prints lines such as
//! `[MEAN] Largest Contentful Paint (LCP): 2.514 seconds`. It may print them
//! once per warm-up round, so only the last occurrence counts.

/// Default event name
pub const LCP_EVENT: &str = "Largest Contentful Paint (LCP)";

const VALUE_SUFFIX: &str = "seconds";

/// Mean and standard deviation of one trial, in seconds.
///
/// A field is NaN when its value could not be scraped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementSample {
    pub mean: f64,
    pub std_dev: f64,
}

impl MeasurementSample {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    /// A sample for a trial that produced no usable output
    pub fn failed() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }

    /// Scrape the `[MEAN]` and `[STDEV]` lines for `event` out of `output`
    pub fn from_output(output: &str, event: &str) -> Self {
        Self {
            mean: marker_value(output, &format!("[MEAN] {}:", event)),
            std_dev: marker_value(output, &format!("[STDEV] {}:", event)),
        }
    }

    /// Both values were scraped
    pub fn is_valid(&self) -> bool {
        !self.mean.is_nan() && !self.std_dev.is_nan()
    }
}

/// Value following the last `marker` up to the word "seconds", or NaN
pub fn marker_value(output: &str, marker: &str) -> f64 {
    let Some(start) = output.rfind(marker) else {
        return f64::NAN;
    };
    let tail = &output[start + marker.len()..];
    let Some(end) = tail.find(VALUE_SUFFIX) else {
        return f64::NAN;
    };

    tail[..end].trim().parse().unwrap_or(f64::NAN)
}
