//! Common test utilities for extperf-core
//!
//! Provides a scratch application checkout and mock build/measure steps that
//! record what the sweep asked of them.

#![allow(dead_code)]

use async_trait::async_trait;
use camino::Utf8PathBuf;
use extperf_core::{BuildStep, Error, ManifestPaths, Measure, MeasureRequest, Result};
use serde_json::Value;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Original live manifest; deliberately formatted unlike serde_json output
pub const ORIGINAL_MANIFEST: &str = "{\"name\":\"@app/dev-mode\",\"dependencies\":{\"@app/core\":\"~4.0.0\",\"@app/old-ext\":\"1.0.0\"}}";

/// Base manifest used between trials
pub const BASE_MANIFEST: &str = r#"{
  "name": "@app/dev-mode",
  "dependencies": {
    "@app/core": "~4.0.0"
  }
}
"#;

pub const LCP: &str = "Largest Contentful Paint (LCP)";

/// Measurement utility output reporting `mean` and `std_dev`
pub fn lcp_output(mean: &str, std_dev: &str) -> String {
    format!(
        "warming up\n[MEAN] {lcp}: 9.999 seconds\n[STDEV] {lcp}: 9.999 seconds\n[MEAN] {lcp}: {} seconds\n[STDEV] {lcp}: {} seconds\ndone\n",
        mean,
        std_dev,
        lcp = LCP
    )
}

/// Scratch checkout with live and base manifests
pub struct Checkout {
    pub temp: TempDir,
    pub root: Utf8PathBuf,
    pub paths: ManifestPaths,
}

impl Checkout {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("dev_mode")).unwrap();

        let paths = ManifestPaths {
            live: root.join("dev_mode/package.json"),
            backup: root.join("dev_mode/package.json.orig"),
            base: root.join("dev_mode/package.base.json"),
        };
        fs::write(&paths.live, ORIGINAL_MANIFEST).unwrap();
        fs::write(&paths.base, BASE_MANIFEST).unwrap();

        Self { temp, root, paths }
    }

    pub fn live_content(&self) -> String {
        fs::read_to_string(&self.paths.live).unwrap()
    }

    /// Add a package directory under `packages/`
    pub fn add_package(&self, folder: &str, name: &str, version: &str) {
        let dir = self.root.join("packages").join(folder);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("package.json"),
            format!("{{\"name\": \"{}\", \"version\": \"{}\"}}", name, version),
        )
        .unwrap();
    }
}

/// Record of a build invocation
#[derive(Clone, Debug, PartialEq)]
pub struct BuildCall {
    pub full: bool,
    /// Live manifest dependencies at the time of the build
    pub dependencies: Value,
}

/// Build step that records calls and can fail on the n-th build
#[derive(Clone)]
pub struct MockBuilder {
    live: Utf8PathBuf,
    calls: Arc<Mutex<Vec<BuildCall>>>,
    fail_on: Option<usize>,
}

impl MockBuilder {
    pub fn new(live: Utf8PathBuf) -> Self {
        Self {
            live,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
        }
    }

    /// Fail the build with this zero-based index
    pub fn failing_on(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }

    pub fn calls(&self) -> Vec<BuildCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildStep for MockBuilder {
    async fn build(&self, full: bool) -> Result<()> {
        let manifest: Value = serde_json::from_str(&fs::read_to_string(&self.live)?)?;
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push(BuildCall {
            full,
            dependencies: manifest["dependencies"].clone(),
        });

        if self.fail_on == Some(index) {
            return Err(Error::command_failed("jlpm run build", "exit status: 1"));
        }
        Ok(())
    }
}

/// Measure step returning canned output per profile name
#[derive(Clone)]
pub struct MockMeasurer {
    outputs: Arc<Mutex<Vec<(String, String)>>>,
    default_output: String,
    requests: Arc<Mutex<Vec<MeasureRequest>>>,
}

impl MockMeasurer {
    /// Every trial prints `output`
    pub fn constant(output: impl Into<String>) -> Self {
        Self {
            outputs: Arc::new(Mutex::new(Vec::new())),
            default_output: output.into(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Trials for profile `name` print `output` instead of the default
    pub fn with_output(self, name: &str, output: impl Into<String>) -> Self {
        self.outputs
            .lock()
            .unwrap()
            .push((name.to_string(), output.into()));
        self
    }

    pub fn requests(&self) -> Vec<MeasureRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Measure for MockMeasurer {
    async fn measure(&self, request: &MeasureRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let outputs = self.outputs.lock().unwrap();
        Ok(outputs
            .iter()
            .find(|(name, _)| name == &request.name)
            .map(|(_, out)| out.clone())
            .unwrap_or_else(|| self.default_output.clone()))
    }
}

/// Split captured report output into lines
pub fn report_lines(out: &[u8]) -> Vec<String> {
    String::from_utf8(out.to_vec())
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}
