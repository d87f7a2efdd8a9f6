//! # extperf-core
//!
//! Core library for the extperf CLI providing:
//! - Extension qualifier parsing and package discovery
//! - Scoped backup/restore of the application manifest
//! - Manifest mutation, rebuilds and measurement runs
//! - Scraping of measurement output and CSV-style reporting
//! - The sweep that sequences all of the above

pub mod build;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod manifest;
pub mod measure;
pub mod parser;
mod process;
pub mod qualifier;
pub mod report;
pub mod sweep;
pub mod types;
pub mod workspace;

pub use build::{BuildStep, CommandBuilder};
pub use config::{ExtperfConfig, ExtperfConfigFile};
pub use error::{Error, Result};
pub use manifest::ManifestMutator;
pub use measure::{CommandMeasurer, Measure, MeasureRequest};
pub use parser::MeasurementSample;
pub use qualifier::Qualifier;
pub use report::{ReportEmitter, ReportRow};
pub use sweep::{Sweep, SweepOutcome, SweepSummary};
pub use types::RunConfig;
pub use workspace::{ManifestPaths, ManifestWorkspace};
