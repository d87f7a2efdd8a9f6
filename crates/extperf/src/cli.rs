//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::Parser;
use extperf_core::types::DEFAULT_RUNS;

/// extperf - Measure page-load latency with and without each extension
///
/// Prints one CSV row per trial on stdout; progress and diagnostics go to stderr.
#[derive(Parser, Debug)]
#[command(name = "extperf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Baseline mean in seconds; skips the baseline measurement
    #[arg(short, long, value_name = "SECONDS")]
    pub base_time: Option<f64>,

    /// Samples taken per trial (at least 2)
    #[arg(short, long, default_value_t = DEFAULT_RUNS)]
    pub runs: u32,

    /// Extensions to measure, each as '"name": "version"'; discovered from the
    /// packages directory when omitted
    #[arg(short, long, num_args = 1.., value_name = "QUALIFIER")]
    pub extensions: Vec<String>,

    /// Run a full install before every build instead of an incremental build
    #[arg(short, long)]
    pub yarn: bool,

    /// URL the application is measured at
    #[arg(short, long)]
    pub url: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report errors on stderr
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to extperf.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,
}
