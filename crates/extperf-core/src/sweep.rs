//! The benchmark sweep
//!
//! ```text
//! acquire workspace -> reset to base -> initial build -> baseline trial
//!   -> for each extension: mutate -> build -> measure -> report -> reset
//! -> restore workspace
//! ```
//!
//! Trials run strictly one after another: they share one live manifest, one
//! build output directory and one application port.

use camino::{Utf8Path, Utf8PathBuf};
use std::future::Future;
use std::io::Write;
use tracing::{info, warn};

use crate::build::BuildStep;
use crate::enumerate::enumerate_packages;
use crate::error::Result;
use crate::manifest::ManifestMutator;
use crate::measure::{Measure, MeasureRequest};
use crate::parser::{MeasurementSample, LCP_EVENT};
use crate::qualifier::Qualifier;
use crate::report::{ReportEmitter, ReportRow};
use crate::types::{RunConfig, BASELINE_LABEL};
use crate::workspace::{ManifestPaths, ManifestWorkspace};

/// State carried through one sweep
#[derive(Debug, Clone)]
pub struct Session {
    pub config: RunConfig,
    pub report: ReportEmitter,
}

impl Session {
    pub fn new(config: RunConfig) -> Self {
        let report = ReportEmitter::new(config.runs, config.base_time);
        Self { config, report }
    }
}

/// Counts reported at the end of a completed sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Rows printed, including the baseline row
    pub rows: usize,
    /// Rows whose measurement failed
    pub failed: usize,
}

/// How a guarded sweep ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    Completed(SweepSummary),
    Interrupted,
}

/// Use the explicit list when given, otherwise discover packages
pub fn resolve_extensions(
    config: &RunConfig,
    packages_dir: &Utf8Path,
    reserved: &[String],
) -> Result<Vec<Qualifier>> {
    if !config.extensions.is_empty() {
        return Ok(config.extensions.clone());
    }
    enumerate_packages(packages_dir, reserved)
}

/// Result folder for trial `index`.
///
/// The index prefix keeps names that sanitise alike (`@a/b`, `a_b`) apart.
pub fn profile_folder_name(index: usize, name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('_');
    let trimmed = if trimmed.is_empty() {
        "extension"
    } else {
        trimmed
    };
    format!("{:03}-{}", index, trimmed)
}

/// Orchestrates the trials of one sweep
pub struct Sweep<B, M> {
    session: Session,
    extensions: Vec<Qualifier>,
    mutator: ManifestMutator,
    builder: B,
    measurer: M,
    event: String,
    results_dir: Utf8PathBuf,
}

impl<B: BuildStep, M: Measure> Sweep<B, M> {
    pub fn new(
        config: RunConfig,
        extensions: Vec<Qualifier>,
        mutator: ManifestMutator,
        builder: B,
        measurer: M,
    ) -> Self {
        Self {
            session: Session::new(config),
            extensions,
            mutator,
            builder,
            measurer,
            event: LCP_EVENT.to_string(),
            results_dir: Utf8PathBuf::from("benchmark-results"),
        }
    }

    /// Event whose markers are scraped from the measurement output
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    /// Parent directory of the per-trial result folders
    pub fn with_results_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run the sweep inside a manifest workspace.
    ///
    /// If `shutdown` resolves first, the in-flight trial is dropped (its child
    /// processes are killed) and the manifest is still restored.
    pub async fn run_guarded<W, F>(
        &mut self,
        paths: &ManifestPaths,
        out: &mut W,
        shutdown: F,
    ) -> Result<SweepOutcome>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        let mut workspace = ManifestWorkspace::acquire(paths.clone())?;

        let result = tokio::select! {
            res = self.run(out) => res.map(SweepOutcome::Completed),
            _ = shutdown => {
                warn!("Interrupted, restoring workspace");
                Ok(SweepOutcome::Interrupted)
            }
        };

        workspace.restore();
        result
    }

    /// Run every trial, writing the header and one row per trial to `out`
    pub async fn run<W: Write>(&mut self, out: &mut W) -> Result<SweepSummary> {
        let mut summary = SweepSummary::default();

        writeln!(out, "{}", self.session.report.header())?;
        out.flush()?;

        self.mutator.apply(None)?;
        info!("Initial build");
        self.builder.build(self.session.config.full_build).await?;

        match self.session.config.base_time {
            Some(base) => {
                info!("Using supplied baseline of {:.3}s", base);
                let row = ReportEmitter::supplied_baseline_row(BASELINE_LABEL, base);
                self.emit(out, &row, &mut summary)?;
            }
            None => {
                let row = self.trial(0, None).await?;
                self.emit(out, &row, &mut summary)?;
            }
        }

        let extensions = self.extensions.clone();
        for (index, extension) in extensions.iter().enumerate() {
            info!(
                "[{}/{}] Measuring {}",
                index + 1,
                extensions.len(),
                extension
            );
            let row = self.trial(index + 1, Some(extension)).await?;
            self.emit(out, &row, &mut summary)?;
        }

        Ok(summary)
    }

    fn emit<W: Write>(
        &self,
        out: &mut W,
        row: &ReportRow,
        summary: &mut SweepSummary,
    ) -> Result<()> {
        writeln!(out, "{}", row)?;
        out.flush()?;
        summary.rows += 1;
        if row.failed {
            summary.failed += 1;
        }
        Ok(())
    }

    /// Measure one extension, or the base manifest when `None`; `index` 0 is the baseline
    async fn trial(
        &mut self,
        index: usize,
        extension: Option<&Qualifier>,
    ) -> Result<ReportRow> {
        let (label, name) = match extension {
            Some(q) => (q.to_string(), q.name().to_string()),
            None => (BASELINE_LABEL.to_string(), BASELINE_LABEL.to_string()),
        };

        if extension.is_some() {
            self.mutator.apply(extension)?;
            self.builder.build(self.session.config.full_build).await?;
        }

        let request = MeasureRequest {
            folder: self.results_dir.join(profile_folder_name(index, &name)),
            name,
            runs: self.session.config.runs,
            url: self.session.config.url.clone(),
        };

        let sample = match self.measurer.measure(&request).await {
            Ok(output) => MeasurementSample::from_output(&output, &self.event),
            Err(e) => {
                warn!("Measurement of {} failed: {}", label, e);
                MeasurementSample::failed()
            }
        };
        if !sample.is_valid() {
            warn!("No {} figures found for {}", self.event, label);
        }

        let row = self.session.report.row(&label, sample);

        if extension.is_some() {
            self.mutator.apply(None)?;
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, "@jupyterlab/git", "001-jupyterlab_git" ; "scoped")]
    #[test_case(0, "baseline", "000-baseline" ; "plain")]
    #[test_case(12, "ns:ext v1", "012-ns_ext_v1" ; "colon and space")]
    #[test_case(3, "my-ext.v2", "003-my-ext.v2" ; "kept punctuation")]
    #[test_case(4, "@/", "004-extension" ; "nothing left")]
    fn test_profile_folder_name(index: usize, name: &str, expected: &str) {
        assert_eq!(profile_folder_name(index, name), expected);
    }

    #[test]
    fn test_similar_names_get_distinct_folders() {
        let folders: Vec<String> = ["@a/b", "a/b", "a_b"]
            .iter()
            .enumerate()
            .map(|(i, name)| profile_folder_name(i + 1, name))
            .collect();
        assert_eq!(folders, vec!["001-a_b", "002-a_b", "003-a_b"]);
    }

    #[test]
    fn test_resolve_prefers_explicit_list() {
        let config = RunConfig::new(
            2,
            None,
            vec![Qualifier::new("a", "1.0.0")],
            false,
            None,
        )
        .unwrap();
        // the packages directory is never read for an explicit list
        let resolved =
            resolve_extensions(&config, Utf8Path::new("/nonexistent/packages"), &[]).unwrap();
        assert_eq!(resolved, vec![Qualifier::new("a", "1.0.0")]);
    }

    #[test]
    fn test_session_seeds_report_baseline() {
        let config = RunConfig::new(3, Some(1.5), Vec::new(), false, None).unwrap();
        let session = Session::new(config);
        assert_eq!(session.report.baseline(), Some(1.5));
    }
}
