//! End-to-end sweeps against real child processes
//!
//! The checkout's build, start and measure commands are small `sh` scripts
//! configured through extperf.yaml.

#![cfg(unix)]

mod common;

use camino::Utf8Path;
use common::*;
use extperf_core::{
    CommandBuilder, CommandMeasurer, Error, ExtperfConfig, ManifestMutator, RunConfig, Sweep,
    SweepOutcome, SweepSummary,
};
use std::fs;
use std::future::pending;

const CONFIG: &str = r#"
build:
  full:
    - [sh, "-c", "echo install >> build.log"]
  incremental:
    - [sh, "-c", "cat dev_mode/package.json >> build.log"]
start: [sh, "-c", "sleep 30"]
measure:
  program: sh
  args:
    - "-c"
    - |
      touch "{folder}/profile.json"
      if [ "{name}" = baseline ]; then m=2.000; else m=2.500; fi
      echo "[MEAN] {event}: $m seconds"
      echo "[STDEV] {event}: 0.100 seconds"
"#;

fn write_config(root: &Utf8Path, contents: &str) -> ExtperfConfig {
    let path = root.join("extperf.yaml");
    fs::write(&path, contents).unwrap();
    ExtperfConfig::load_from(Some(&path), root).unwrap()
}

fn sweep_for(
    config: &ExtperfConfig,
    run: RunConfig,
) -> Sweep<CommandBuilder, CommandMeasurer> {
    let extensions = run.extensions.clone();
    Sweep::new(
        run,
        extensions,
        ManifestMutator::from_paths(&config.manifest_paths()),
        CommandBuilder::from_config(config),
        CommandMeasurer::from_config(config),
    )
    .with_event(config.config.measure.event.clone())
    .with_results_dir(config.results_dir())
}

#[tokio::test]
async fn test_sweep_with_shell_commands() {
    let checkout = Checkout::new();
    let config = write_config(&checkout.root, CONFIG);
    assert_eq!(config.manifest_paths(), checkout.paths);

    let run = RunConfig::new(
        3,
        None,
        RunConfig::parse_extensions(&["\"@app/git\": \"0.50.0\""]).unwrap(),
        false,
        None,
    )
    .unwrap();
    let mut sweep = sweep_for(&config, run);

    let mut out = Vec::new();
    let outcome = sweep
        .run_guarded(&checkout.paths, &mut out, pending())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SweepOutcome::Completed(SweepSummary { rows: 2, failed: 0 })
    );
    assert_eq!(
        report_lines(&out),
        vec![
            "Extension Name, Mean (3 runs) (in s), Std Dev (in s), CV (%), Delta (in s)",
            "baseline, 2.000, 0.100, 5.000, -",
            "\"@app/git\": \"0.50.0\", 2.500, 0.100, 4.000, 0.500",
        ]
    );

    // two builds: initial, then with the extension added
    let log = fs::read_to_string(checkout.root.join("build.log")).unwrap();
    assert!(!log.contains("install"));
    assert!(!log.contains("@app/old-ext"));
    assert_eq!(log.matches("\"@app/git\": \"0.50.0\"").count(), 1);

    let results = config.results_dir();
    assert!(results.join("000-baseline/profile.json").is_file());
    assert!(results.join("001-app_git/profile.json").is_file());

    assert_eq!(checkout.live_content(), ORIGINAL_MANIFEST);
    assert!(!checkout.paths.backup.exists());
}

#[tokio::test]
async fn test_full_build_runs_install_sequence() {
    let checkout = Checkout::new();
    let config = write_config(&checkout.root, CONFIG);

    let run = RunConfig::new(2, Some(2.0), Vec::new(), true, None).unwrap();
    let mut sweep = sweep_for(&config, run);

    let mut out = Vec::new();
    sweep
        .run_guarded(&checkout.paths, &mut out, pending())
        .await
        .unwrap();

    let log = fs::read_to_string(checkout.root.join("build.log")).unwrap();
    assert!(log.starts_with("install\n"));
    assert_eq!(
        report_lines(&out)[1..],
        ["baseline, 2.000, -, -, -".to_string()]
    );
}

#[tokio::test]
async fn test_failing_build_restores_manifest() {
    let checkout = Checkout::new();
    let config = write_config(
        &checkout.root,
        "build:\n  incremental:\n    - [sh, \"-c\", \"exit 3\"]\nstart: [sh, \"-c\", \"sleep 30\"]\n",
    );

    let run = RunConfig::new(2, None, Vec::new(), false, None).unwrap();
    let mut sweep = sweep_for(&config, run);

    let mut out = Vec::new();
    let err = sweep
        .run_guarded(&checkout.paths, &mut out, pending())
        .await
        .unwrap_err();

    match err {
        Error::CommandFailed { command, .. } => assert_eq!(command, "sh -c exit 3"),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(checkout.live_content(), ORIGINAL_MANIFEST);
    assert!(!checkout.paths.backup.exists());
}

#[tokio::test]
async fn test_stale_backup_is_recovered_first() {
    let checkout = Checkout::new();
    let config = write_config(&checkout.root, CONFIG);

    // left behind by a sweep that was killed outright
    fs::copy(&checkout.paths.live, &checkout.paths.backup).unwrap();
    fs::write(&checkout.paths.live, BASE_MANIFEST).unwrap();

    let run = RunConfig::new(2, Some(1.0), Vec::new(), false, None).unwrap();
    let mut sweep = sweep_for(&config, run);

    let mut out = Vec::new();
    sweep
        .run_guarded(&checkout.paths, &mut out, pending())
        .await
        .unwrap();

    assert_eq!(checkout.live_content(), ORIGINAL_MANIFEST);
    assert!(!checkout.paths.backup.exists());
}
