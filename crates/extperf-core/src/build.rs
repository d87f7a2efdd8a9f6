//! Application rebuilds
//!
//! Each trial rebuilds the application against the freshly written manifest.
//! Build output is logged at debug level only; a failing build stops the sweep.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use tracing::{debug, info};

use crate::config::{CommandLine, ExtperfConfig};
use crate::error::{Error, Result};
use crate::process::{forward_output, piped_command, spawn};

/// Rebuilds the application after a manifest change
#[async_trait]
pub trait BuildStep: Send + Sync {
    /// Run a full install+build when `full`, otherwise an incremental build
    async fn build(&self, full: bool) -> Result<()>;
}

/// Runs the configured build commands in the checkout root
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    /// Directory commands run in
    root: Utf8PathBuf,

    /// Install + build sequence
    full: Vec<CommandLine>,

    /// Build-only sequence
    incremental: Vec<CommandLine>,
}

impl CommandBuilder {
    pub fn new(
        root: impl Into<Utf8PathBuf>,
        full: Vec<CommandLine>,
        incremental: Vec<CommandLine>,
    ) -> Self {
        Self {
            root: root.into(),
            full,
            incremental,
        }
    }

    pub fn from_config(config: &ExtperfConfig) -> Self {
        Self::new(
            config.root(),
            config.build_commands(true).to_vec(),
            config.build_commands(false).to_vec(),
        )
    }

    async fn run_command(&self, command: &CommandLine) -> Result<()> {
        let shown = command.to_string();
        let program = command
            .program()
            .ok_or_else(|| Error::invalid_config("Build command is empty"))?;

        debug!("Running `{}` in {}", shown, self.root);
        let mut cmd = piped_command(&self.root, program, command.args());
        let mut child = spawn(&mut cmd, &shown)?;

        let tag = program.to_string();
        let drains = forward_output(&mut child, move |line| debug!("{}: {}", tag, line));

        let status = child.wait().await?;
        for drain in drains {
            let _ = drain.await;
        }

        if status.success() {
            Ok(())
        } else {
            Err(Error::command_failed(shown, status))
        }
    }
}

#[async_trait]
impl BuildStep for CommandBuilder {
    async fn build(&self, full: bool) -> Result<()> {
        let commands = if full { &self.full } else { &self.incremental };
        info!(
            "Running {} build ({} commands)",
            if full { "full" } else { "incremental" },
            commands.len()
        );

        for command in commands {
            self.run_command(command).await?;
        }
        Ok(())
    }
}
