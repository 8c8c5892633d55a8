//! Keel daemon
//!
//! The process-wide entry point the command line talks to. It holds the
//! data directory, the compose manager and the lock policy, all fixed at
//! construction, and hands each request to the matching lifecycle
//! operation.

use crate::command::{CommandRunner, ProcessRunner};
use crate::compose::ComposeManager;
use crate::config::DaemonConfig;
use crate::data::{validate_instance_id, DataDir, Instance, LockPolicy};
use crate::error::Result;
use crate::lifecycle::{self, InstallSpec, InstanceState};
use crate::source::{RepositoryFetcher, SourceFetcher};
use std::sync::Arc;

/// Keel daemon
pub struct Daemon<R = ProcessRunner, F = RepositoryFetcher<ProcessRunner>> {
    data_dir: DataDir,
    compose: ComposeManager<R>,
    fetcher: F,
    lock_policy: LockPolicy,
}

impl Daemon {
    /// Create a daemon that drives real processes
    pub fn new(config: &DaemonConfig) -> Result<Self> {
        Self::with_runner(config, Arc::new(ProcessRunner::new()))
    }
}

impl<R: CommandRunner> Daemon<R, RepositoryFetcher<R>> {
    /// Create a daemon whose external commands go through `runner`
    pub fn with_runner(config: &DaemonConfig, runner: Arc<R>) -> Result<Self> {
        config.validate()?;
        let data_dir = DataDir::new(config.data_dir.clone())?;
        tracing::debug!("Using data directory {}", data_dir.root().display());

        Ok(Self {
            data_dir,
            compose: ComposeManager::new(runner.clone(), config.compose.clone()),
            fetcher: RepositoryFetcher::new(runner),
            lock_policy: config.lock_timeout.into(),
        })
    }
}

impl<R: CommandRunner, F: SourceFetcher> Daemon<R, F> {
    pub fn data_dir(&self) -> &DataDir {
        &self.data_dir
    }

    /// Install an instance; returns its id
    pub async fn install(&self, spec: &InstallSpec) -> Result<String> {
        lifecycle::install(&self.data_dir, &self.fetcher, self.lock_policy, spec).await
    }

    /// Start an installed instance
    pub async fn start(&self, id: &str) -> Result<()> {
        validate_instance_id(id)?;
        lifecycle::start(&self.data_dir, &self.compose, self.lock_policy, id).await
    }

    /// Stop a running instance
    pub async fn stop(&self, id: &str) -> Result<()> {
        validate_instance_id(id)?;
        lifecycle::stop(&self.data_dir, &self.compose, self.lock_policy, id).await
    }

    /// Tear down and delete an instance; `false` if it was not installed
    pub async fn uninstall(&self, id: &str) -> Result<bool> {
        validate_instance_id(id)?;
        lifecycle::uninstall(&self.data_dir, &self.compose, self.lock_policy, id).await
    }

    /// Ids of all installed instances
    pub fn list(&self) -> Result<Vec<String>> {
        self.data_dir.list()
    }

    /// Current state of an instance
    pub async fn state(&self, id: &str) -> Result<InstanceState> {
        validate_instance_id(id)?;
        lifecycle::state(&self.data_dir, &self.compose, id).await
    }

    /// Handle on an installed instance, for reading its metadata
    pub fn instance(&self, id: &str) -> Result<Instance> {
        self.data_dir.resolve(id)
    }
}
