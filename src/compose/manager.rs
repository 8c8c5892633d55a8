//! Typed adapter over the orchestration tool's verbs
//!
//! The manager owns no state and never retries: a failed verb is reported
//! straight back to the lifecycle operation that issued it.

use crate::command::{CommandOutput, CommandRunner, CommandSpec};
use crate::config::ComposeConfig;
use crate::error::{KeelError, Result};
use std::path::Path;
use std::sync::Arc;

/// Options for `up`
#[derive(Debug, Clone, Copy)]
pub struct ComposeUpOptions<'a> {
    pub path: &'a Path,
    pub profile: Option<&'a str>,
}

/// Options for `down`
#[derive(Debug, Clone, Copy)]
pub struct ComposeDownOptions<'a> {
    pub path: &'a Path,
    pub profile: Option<&'a str>,
}

/// Options for `stop`
#[derive(Debug, Clone, Copy)]
pub struct ComposeStopOptions<'a> {
    pub path: &'a Path,
    pub profile: Option<&'a str>,
}

/// Options for `ps`
#[derive(Debug, Clone, Copy)]
pub struct ComposePsOptions<'a> {
    pub path: &'a Path,
    pub profile: Option<&'a str>,
}

/// Compose manager
pub struct ComposeManager<R> {
    runner: Arc<R>,
    config: ComposeConfig,
}

impl<R: CommandRunner> ComposeManager<R> {
    /// Create a new compose manager
    pub fn new(runner: Arc<R>, config: ComposeConfig) -> Self {
        Self { runner, config }
    }

    /// Bring the containers of a compose file up, detached
    pub async fn up(&self, options: ComposeUpOptions<'_>) -> Result<()> {
        let spec = self.command(options.path, options.profile, &["up", "-d"]);
        self.execute(&spec).await.map(drop)
    }

    /// Stop and remove the containers, networks and orphans of a compose file
    pub async fn down(&self, options: ComposeDownOptions<'_>) -> Result<()> {
        let spec = self.command(options.path, options.profile, &["down", "--remove-orphans"]);
        self.execute(&spec).await.map(drop)
    }

    /// Stop the containers of a compose file without removing them
    pub async fn stop(&self, options: ComposeStopOptions<'_>) -> Result<()> {
        let spec = self.command(options.path, options.profile, &["stop"]);
        self.execute(&spec).await.map(drop)
    }

    /// Names of the services currently running
    pub async fn ps(&self, options: ComposePsOptions<'_>) -> Result<Vec<String>> {
        let spec = self.command(
            options.path,
            options.profile,
            &["ps", "--status", "running", "--services"],
        );
        let output = self.execute(&spec).await?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn command(&self, path: &Path, profile: Option<&str>, verb: &[&str]) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.config.program)
            .args(self.config.args.iter().cloned())
            .arg("-f")
            .arg(path.to_string_lossy());
        if let Some(profile) = profile {
            spec = spec.arg("--profile").arg(profile);
        }
        spec.args(verb.iter().copied())
    }

    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let output = self.runner.run(spec).await?;
        if !output.success() {
            tracing::debug!("{} failed: {}", spec, output.stderr.trim());
            return Err(KeelError::OrchestrationFailed {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }
}
