//! Daemon configuration
//!
//! Resolution order for every setting: built-in default, then environment
//! (`KEEL_DATA_DIR`, `KEEL_COMPOSE`, `KEEL_LOCK_TIMEOUT`), then whatever the
//! caller sets explicitly (the CLI applies its flags last).

use crate::error::{KeelError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DATA_DIR_ENV: &str = "KEEL_DATA_DIR";
pub const COMPOSE_ENV: &str = "KEEL_COMPOSE";
pub const LOCK_TIMEOUT_ENV: &str = "KEEL_LOCK_TIMEOUT";

/// How the orchestration tool is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeConfig {
    /// Executable, e.g. `docker`
    pub program: String,
    /// Arguments placed before every verb, e.g. `["compose"]`
    pub args: Vec<String>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            args: vec!["compose".to_string()],
        }
    }
}

impl ComposeConfig {
    /// Parse a whitespace separated command line such as `podman compose`
    pub fn from_command_line(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| KeelError::InvalidConfig("empty compose command".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

/// Keel daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Root directory holding one subdirectory per instance
    pub data_dir: PathBuf,
    /// Orchestration tool invocation
    pub compose: ComposeConfig,
    /// Bound on lock acquisition; `None` waits indefinitely
    pub lock_timeout: Option<Duration>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            compose: ComposeConfig::default(),
            lock_timeout: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/var/lib"))
        .join("keel")
        .join("instances")
}

impl DaemonConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(line) = lookup(COMPOSE_ENV) {
            config.compose = ComposeConfig::from_command_line(&line)?;
        }

        if let Some(raw) = lookup(LOCK_TIMEOUT_ENV) {
            config.lock_timeout = Some(parse_timeout(&raw)?);
        }

        Ok(config)
    }

    /// Builder-style data directory override
    pub fn data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = data_dir;
        self
    }

    /// Builder-style lock timeout override
    pub fn lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Reject settings the daemon cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.data_dir.is_absolute() {
            return Err(KeelError::InvalidConfig(format!(
                "data directory must be absolute: {}",
                self.data_dir.display()
            )));
        }
        if self.compose.program.trim().is_empty() {
            return Err(KeelError::InvalidConfig(
                "compose program must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a lock timeout given in (possibly fractional) seconds
pub fn parse_timeout(raw: &str) -> Result<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| KeelError::InvalidConfig(format!("invalid lock timeout: {raw:?}")))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(KeelError::InvalidConfig(format!(
            "lock timeout must be a non-negative number of seconds: {raw:?}"
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}
