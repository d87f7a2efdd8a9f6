//! Configuration file loading and parsing
//!
//! `extperf.yaml` describes where the application's manifest lives and which
//! commands build, start and measure it. Every key is optional; a checkout
//! without a config file gets the built-in JupyterLab-style layout.

use crate::error::{Error, Result};
use crate::workspace::ManifestPaths;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use tracing::debug;

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["extperf.yaml", "extperf.yml"];

/// An argv vector: program followed by its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandLine(pub Vec<String>);

impl CommandLine {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(argv.into_iter().map(Into::into).collect())
    }

    /// Program to execute, if the vector is non-empty
    pub fn program(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Arguments after the program
    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Contents of extperf.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtperfConfigFile {
    /// Application checkout root, relative to the config file
    #[serde(default = "default_root")]
    pub root: Utf8PathBuf,

    /// Live application manifest, relative to root
    #[serde(default = "default_manifest")]
    pub manifest: Utf8PathBuf,

    /// Where the pristine manifest is parked during a sweep
    #[serde(default = "default_backup")]
    pub backup: Utf8PathBuf,

    /// Manifest without any added extension
    #[serde(default = "default_base_manifest")]
    pub base_manifest: Utf8PathBuf,

    /// Directory holding one subdirectory per extension package
    #[serde(default = "default_packages_dir")]
    pub packages_dir: Utf8PathBuf,

    /// Package directories never treated as extensions
    #[serde(default = "default_reserved_packages")]
    pub reserved_packages: Vec<String>,

    #[serde(default)]
    pub build: BuildConfig,

    /// Command that serves the application
    #[serde(default = "default_start")]
    pub start: CommandLine,

    #[serde(default)]
    pub measure: MeasureConfig,
}

/// Build commands, run in order from the checkout root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Install dependencies and build everything
    #[serde(default = "default_full_build")]
    pub full: Vec<CommandLine>,

    /// Rebuild against already installed dependencies
    #[serde(default = "default_incremental_build")]
    pub incremental: Vec<CommandLine>,
}

/// Measurement utility invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MeasureConfig {
    #[serde(default = "default_measure_program")]
    pub program: String,

    /// Argument template; `{event}`, `{name}`, `{folder}` and `{runs}` are substituted
    #[serde(default = "default_measure_args")]
    pub args: Vec<String>,

    /// Appended only when a URL is given; `{url}` is substituted
    #[serde(default = "default_measure_url_args")]
    pub url_args: Vec<String>,

    /// Event whose `[MEAN]`/`[STDEV]` lines are scraped
    #[serde(default = "default_event")]
    pub event: String,

    /// Parent directory for per-trial result folders, relative to root
    #[serde(default = "default_results_dir")]
    pub results_dir: Utf8PathBuf,
}

fn default_root() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}
fn default_manifest() -> Utf8PathBuf {
    Utf8PathBuf::from("dev_mode/package.json")
}
fn default_backup() -> Utf8PathBuf {
    Utf8PathBuf::from("dev_mode/package.json.orig")
}
fn default_base_manifest() -> Utf8PathBuf {
    Utf8PathBuf::from("dev_mode/package.base.json")
}
fn default_packages_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("packages")
}
fn default_reserved_packages() -> Vec<String> {
    vec!["core".to_string()]
}
fn default_start() -> CommandLine {
    CommandLine::new(["jlpm", "run", "start"])
}
fn default_full_build() -> Vec<CommandLine> {
    vec![
        CommandLine::new(["jlpm", "install"]),
        CommandLine::new(["jlpm", "run", "build"]),
    ]
}
fn default_incremental_build() -> Vec<CommandLine> {
    vec![CommandLine::new(["jlpm", "run", "build"])]
}
fn default_measure_program() -> String {
    "node".to_string()
}
fn default_measure_args() -> Vec<String> {
    [
        "scripts/measure-lcp.js",
        "--event",
        "{event}",
        "--name",
        "{name}",
        "--folder",
        "{folder}",
        "--runs",
        "{runs}",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_measure_url_args() -> Vec<String> {
    vec!["--url".to_string(), "{url}".to_string()]
}
fn default_event() -> String {
    "Largest Contentful Paint (LCP)".to_string()
}
fn default_results_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("benchmark-results")
}

impl Default for ExtperfConfigFile {
    fn default() -> Self {
        Self {
            root: default_root(),
            manifest: default_manifest(),
            backup: default_backup(),
            base_manifest: default_base_manifest(),
            packages_dir: default_packages_dir(),
            reserved_packages: default_reserved_packages(),
            build: BuildConfig::default(),
            start: default_start(),
            measure: MeasureConfig::default(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            full: default_full_build(),
            incremental: default_incremental_build(),
        }
    }
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            program: default_measure_program(),
            args: default_measure_args(),
            url_args: default_measure_url_args(),
            event: default_event(),
            results_dir: default_results_dir(),
        }
    }
}

/// Loaded extperf configuration
#[derive(Debug, Clone)]
pub struct ExtperfConfig {
    /// The parsed configuration
    pub config: ExtperfConfigFile,

    /// Path to the configuration file, if one was found
    pub config_path: Option<Utf8PathBuf>,

    /// Directory relative paths in the config resolve against
    pub working_dir: Utf8PathBuf,
}

impl ExtperfConfig {
    /// Load configuration from the given path, or search from the current directory
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let cwd = env::current_dir()?;
        let cwd = Utf8PathBuf::try_from(cwd)
            .map_err(|_| Error::invalid_config("Current directory path is not valid UTF-8"))?;
        Self::load_from(path, &cwd)
    }

    /// Load configuration, searching `start` and its parents when no path is given
    pub fn load_from(path: Option<&Utf8Path>, start: &Utf8Path) -> Result<Self> {
        let found = match path {
            Some(p) => {
                let content = fs::read_to_string(p).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::config_not_found(p.as_str())
                    } else {
                        Error::Io(e)
                    }
                })?;
                Some((p.to_owned(), content))
            }
            None => Self::find_config(start)?,
        };

        let loaded = match found {
            Some((config_path, content)) => {
                debug!("Loading configuration from {}", config_path);
                let config: ExtperfConfigFile = if content.trim().is_empty() {
                    ExtperfConfigFile::default()
                } else {
                    serde_yaml_ng::from_str(&content)?
                };
                let working_dir = config_path
                    .parent()
                    .filter(|p| !p.as_str().is_empty())
                    .map(|p| p.to_owned())
                    .unwrap_or_else(|| start.to_owned());
                Self {
                    config,
                    config_path: Some(config_path),
                    working_dir,
                }
            }
            None => {
                debug!("No configuration file found, using defaults");
                Self::with_defaults(start)
            }
        };

        loaded.apply_env_overrides()
    }

    /// Defaults rooted at `working_dir`
    pub fn with_defaults(working_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            config: ExtperfConfigFile::default(),
            config_path: None,
            working_dir: working_dir.into(),
        }
    }

    fn find_config(start: &Utf8Path) -> Result<Option<(Utf8PathBuf, String)>> {
        let mut current = start;

        loop {
            for name in CONFIG_FILE_NAMES {
                let path = current.join(name);
                if path.exists() {
                    let content = fs::read_to_string(&path)?;
                    return Ok(Some((path, content)));
                }
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
    }

    fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(val) = env::var("EXTPERF_ROOT") {
            if val.trim().is_empty() {
                return Err(Error::invalid_config("EXTPERF_ROOT must not be empty"));
            }
            self.config.root = Utf8PathBuf::from(val);
        }

        if let Ok(val) = env::var("EXTPERF_EVENT") {
            if val.trim().is_empty() {
                return Err(Error::invalid_config("EXTPERF_EVENT must not be empty"));
            }
            self.config.measure.event = val;
        }

        Ok(self)
    }

    /// Application checkout root; build, start and measure commands run here
    pub fn root(&self) -> Utf8PathBuf {
        self.working_dir.join(&self.config.root)
    }

    /// Live, backup and base manifest locations
    pub fn manifest_paths(&self) -> ManifestPaths {
        let root = self.root();
        ManifestPaths {
            live: root.join(&self.config.manifest),
            backup: root.join(&self.config.backup),
            base: root.join(&self.config.base_manifest),
        }
    }

    pub fn packages_dir(&self) -> Utf8PathBuf {
        self.root().join(&self.config.packages_dir)
    }

    pub fn results_dir(&self) -> Utf8PathBuf {
        self.root().join(&self.config.measure.results_dir)
    }

    /// Build commands for the selected mode
    pub fn build_commands(&self, full: bool) -> &[CommandLine] {
        if full {
            &self.config.build.full
        } else {
            &self.config.build.incremental
        }
    }

    /// Check that every program the sweep will launch can be found.
    ///
    /// Relative program paths resolve against the checkout root.
    pub fn check_tools(&self, full_build: bool) -> Result<()> {
        let root = self.root();
        let mut programs: Vec<&str> = Vec::new();

        for command in self
            .build_commands(full_build)
            .iter()
            .chain(std::iter::once(&self.config.start))
        {
            let program = command
                .program()
                .ok_or_else(|| Error::invalid_config("Configured command is empty"))?;
            programs.push(program);
        }
        if self.config.measure.program.is_empty() {
            return Err(Error::invalid_config("measure.program must not be empty"));
        }
        programs.push(&self.config.measure.program);

        for program in programs {
            which::which_in(program, env::var_os("PATH"), root.as_std_path()).map_err(|_| {
                Error::invalid_config(format!("Required program not found: {}", program))
            })?;
        }

        Ok(())
    }
}
