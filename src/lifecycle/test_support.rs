//! Shared fixture for lifecycle tests

use super::{install, InstallSpec};
use crate::command::testing::FakeRunner;
use crate::compose::{ComposeManager, COMPOSE_FILE_NAME};
use crate::config::ComposeConfig;
use crate::data::{DataDir, LockPolicy};
use crate::source::RepositoryFetcher;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const PROFILE: &str = "option-returner";

/// Lay out a repository named `mock-avs` under `parent` with one profile
pub fn write_repository(parent: &Path) -> String {
    let repo = parent.join("mock-avs");
    let profile = repo.join("pkg").join(PROFILE);
    fs::create_dir_all(&profile).unwrap();
    fs::write(
        profile.join(COMPOSE_FILE_NAME),
        "services:\n  option-returner:\n    image: mock-avs/option-returner:latest\n    profiles: [option-returner]\n",
    )
    .unwrap();
    fs::write(profile.join(".env"), "PORT=8080\n").unwrap();
    repo.to_string_lossy().into_owned()
}

pub struct Fixture {
    pub temp: TempDir,
    pub data: DataDir,
    pub runner: Arc<FakeRunner>,
    pub compose: ComposeManager<FakeRunner>,
    pub fetcher: RepositoryFetcher<FakeRunner>,
    pub policy: LockPolicy,
    pub repo_url: String,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_runner(FakeRunner::new())
    }

    pub fn with_runner(runner: FakeRunner) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let data = DataDir::new(temp.path().join("instances")).unwrap();
        let repo_url = write_repository(temp.path());
        let runner = Arc::new(runner);
        Self {
            data,
            compose: ComposeManager::new(runner.clone(), ComposeConfig::default()),
            fetcher: RepositoryFetcher::new(runner.clone()),
            runner,
            policy: LockPolicy::Timeout(Duration::from_secs(5)),
            repo_url,
            temp,
        }
    }

    pub fn spec(&self) -> InstallSpec {
        InstallSpec::new(&self.repo_url, PROFILE)
    }

    /// Install the fixture repository and return the instance id
    pub async fn install(&self) -> String {
        install(&self.data, &self.fetcher, self.policy, &self.spec())
            .await
            .unwrap()
    }
}
