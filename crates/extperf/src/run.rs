//! The benchmark command
//!
//! Validates options, runs the preflight checks, then hands the sweep to
//! [`Sweep::run_guarded`] with Ctrl-C as its shutdown signal.

use anyhow::{Context, Result};
use async_trait::async_trait;
use extperf_core::manifest::check_manifest;
use extperf_core::sweep::resolve_extensions;
use extperf_core::{
    BuildStep, CommandBuilder, CommandMeasurer, ExtperfConfig, ManifestMutator, RunConfig,
    Sweep, SweepOutcome,
};
use std::future::pending;
use tracing::warn;

use crate::cli::Cli;
use crate::output;

/// Shows a spinner on stderr while the wrapped build runs
struct SpinnerBuild<B> {
    inner: B,
    enabled: bool,
}

#[async_trait]
impl<B: BuildStep> BuildStep for SpinnerBuild<B> {
    async fn build(&self, full: bool) -> extperf_core::Result<()> {
        let spinner = self.enabled.then(|| {
            output::spinner(if full {
                "Installing and building..."
            } else {
                "Building..."
            })
        });
        let result = self.inner.build(full).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        result
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    // nothing is touched before the options are known to be valid
    let extensions = RunConfig::parse_extensions(&cli.extensions)?;
    let run_config = RunConfig::new(cli.runs, cli.base_time, extensions, cli.yarn, cli.url)?;

    let config =
        ExtperfConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.check_tools(run_config.full_build)?;

    let paths = config.manifest_paths();
    check_manifest(&paths.base)
        .with_context(|| format!("Base manifest {} is not usable", paths.base))?;

    let extensions = resolve_extensions(
        &run_config,
        &config.packages_dir(),
        &config.config.reserved_packages,
    )
    .context("Failed to enumerate extensions")?;

    if !cli.quiet {
        output::info("Extension load-time benchmark");
        if let Some(path) = &config.config_path {
            output::kv("Config", path.as_str());
        }
        output::kv("Root", config.root().as_str());
        output::kv("Event", &config.config.measure.event);
        output::kv("Runs", &run_config.runs.to_string());
        output::kv("Extensions", &extensions.len().to_string());
        output::kv(
            "Build",
            if run_config.full_build {
                "full"
            } else {
                "incremental"
            },
        );
    }
    if extensions.is_empty() {
        output::warning("No extensions to measure; only the baseline will be reported");
    }

    let builder = SpinnerBuild {
        inner: CommandBuilder::from_config(&config),
        enabled: !cli.quiet,
    };
    let mut sweep = Sweep::new(
        run_config,
        extensions,
        ManifestMutator::from_paths(&paths),
        builder,
        CommandMeasurer::from_config(&config),
    )
    .with_event(config.config.measure.event.clone())
    .with_results_dir(config.results_dir());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            pending::<()>().await;
        }
    };

    let outcome = sweep.run_guarded(&paths, &mut out, shutdown).await?;

    match outcome {
        SweepOutcome::Completed(summary) => {
            if summary.failed > 0 {
                output::warning(&format!(
                    "{} of {} trials produced no measurement",
                    summary.failed, summary.rows
                ));
            } else if !cli.quiet {
                output::success(&format!("Reported {} trials", summary.rows));
            }
        }
        SweepOutcome::Interrupted => {
            output::warning("Interrupted; original manifest restored");
        }
    }

    Ok(())
}
