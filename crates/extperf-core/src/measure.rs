//! Measurement runs
//!
//! A trial starts the application and the measurement utility side by side.
//! The utility's output is collected; the application's output is dropped so
//! it cannot interleave with the `[MEAN]`/`[STDEV]` lines. When the utility
//! exits the application is killed together with every process it forked.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use std::fs;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace, warn};

use crate::config::{CommandLine, ExtperfConfig, MeasureConfig};
use crate::error::{Error, Result};
use crate::process::{forward_output, piped_command, spawn};

/// What to measure for one trial
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureRequest {
    /// Profile name handed to the measurement utility
    pub name: String,

    /// Directory the utility writes its artifacts to
    pub folder: Utf8PathBuf,

    /// Samples to take
    pub runs: u32,

    /// URL override
    pub url: Option<String>,
}

/// Produces the raw text output of one measurement
#[async_trait]
pub trait Measure: Send + Sync {
    async fn measure(&self, request: &MeasureRequest) -> Result<String>;
}

/// Runs the application and the measurement utility as child processes
#[derive(Debug, Clone)]
pub struct CommandMeasurer {
    root: Utf8PathBuf,
    start: CommandLine,
    measure: MeasureConfig,
}

impl CommandMeasurer {
    pub fn new(root: impl Into<Utf8PathBuf>, start: CommandLine, measure: MeasureConfig) -> Self {
        Self {
            root: root.into(),
            start,
            measure,
        }
    }

    pub fn from_config(config: &ExtperfConfig) -> Self {
        Self::new(
            config.root(),
            config.config.start.clone(),
            config.config.measure.clone(),
        )
    }

    /// Measurement utility argv with placeholders filled in
    pub fn measure_args(&self, request: &MeasureRequest) -> Vec<String> {
        let runs = request.runs.to_string();
        let fill = |arg: &String| {
            arg.replace("{event}", &self.measure.event)
                .replace("{name}", &request.name)
                .replace("{folder}", request.folder.as_str())
                .replace("{runs}", &runs)
        };

        let mut args: Vec<String> = self.measure.args.iter().map(fill).collect();
        if let Some(url) = &request.url {
            args.extend(
                self.measure
                    .url_args
                    .iter()
                    .map(|arg| fill(arg).replace("{url}", url)),
            );
        }
        args
    }
}

#[async_trait]
impl Measure for CommandMeasurer {
    async fn measure(&self, request: &MeasureRequest) -> Result<String> {
        fs::create_dir_all(&request.folder)?;

        let start_program = self
            .start
            .program()
            .ok_or_else(|| Error::invalid_config("Start command is empty"))?;
        let start_display = self.start.to_string();
        let mut app_cmd = piped_command(&self.root, start_program, self.start.args());
        let mut app = spawn(&mut app_cmd, &start_display)?;
        let app_drains = forward_output(&mut app, |line| trace!("app: {}", line));

        let args = self.measure_args(request);
        let tool_display = format!("{} {}", self.measure.program, args.join(" "));
        debug!("Running `{}`", tool_display);
        let mut tool_cmd = piped_command(&self.root, &self.measure.program, &args);
        let mut tool = spawn(&mut tool_cmd, &tool_display)?;

        let captured = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&captured);
        let tool_drains = forward_output(&mut tool, move |line| {
            debug!("measure: {}", line);
            if let Ok(mut buf) = sink.lock() {
                buf.push_str(&line);
                buf.push('\n');
            }
        });

        let mut app_running = true;
        let status = loop {
            tokio::select! {
                status = tool.wait() => break status?,
                app_status = app.wait(), if app_running => {
                    app_running = false;
                    match app_status {
                        Ok(s) => warn!("Application exited before measurement finished ({})", s),
                        Err(e) => warn!("Lost track of application process: {}", e),
                    }
                }
            }
        };

        if app_running {
            app.kill().await;
        }
        // processes that left the app's tree may still hold its pipes open
        for drain in app_drains {
            drain.abort();
        }
        for drain in tool_drains {
            let _ = drain.await;
        }

        if !status.success() {
            warn!("Measurement utility exited with {}", status);
        }

        let output = captured
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default();
        Ok(output)
    }
}
