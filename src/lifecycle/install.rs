//! Install: create an instance directory from a repository profile

use crate::compose::ComposeFile;
use crate::data::{instance_id, DataDir, Instance, InstanceMetadata, LockPolicy};
use crate::error::{KeelError, Phase, Result};
use crate::source::{repository_name, FetchRequest, SourceFetcher};
use chrono::Utc;

/// Tag used when the caller does not pick one
pub const DEFAULT_TAG: &str = "default";

/// What to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSpec {
    /// Repository URL or local checkout path
    pub url: String,
    /// Git ref to install, `None` for the default branch
    pub version: Option<String>,
    /// Profile directory under `pkg/`
    pub profile: String,
    /// Distinguishes several installs of one repository
    pub tag: String,
}

impl InstallSpec {
    pub fn new(url: &str, profile: &str) -> Self {
        Self {
            url: url.to_string(),
            version: None,
            profile: profile.to_string(),
            tag: DEFAULT_TAG.to_string(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }

    /// Instance id this spec installs as
    pub fn instance_id(&self) -> Result<String> {
        instance_id(&repository_name(&self.url)?, &self.tag)
    }
}

/// Install an instance and return its id.
///
/// Containers are not started. The instance is assembled in a staging
/// directory and only appears under its id once complete; a failed install
/// leaves nothing behind and can simply be retried.
pub async fn install<F: SourceFetcher>(
    data_dir: &DataDir,
    fetcher: &F,
    policy: LockPolicy,
    spec: &InstallSpec,
) -> Result<String> {
    let id = spec
        .instance_id()
        .map_err(|e| e.in_phase(Phase::Install, &spec.url))?;

    tracing::info!("Installing {} (profile {}) as {}", spec.url, spec.profile, id);
    install_instance(data_dir, fetcher, policy, spec, &id)
        .await
        .map_err(|e| e.in_phase(Phase::Install, &id))?;
    tracing::info!("Instance {} installed", id);

    Ok(id)
}

async fn install_instance<F: SourceFetcher>(
    data_dir: &DataDir,
    fetcher: &F,
    policy: LockPolicy,
    spec: &InstallSpec,
    id: &str,
) -> Result<()> {
    if data_dir.contains(id) {
        return Err(KeelError::InstanceExists(id.to_string()));
    }

    let staged = data_dir.stage(id)?;
    // Held across the rename, so the installed directory is never unlocked
    // before it is complete.
    let lock = match staged.lock(policy).await {
        Ok(lock) => lock,
        Err(e) => {
            discard(data_dir, &staged);
            return Err(e);
        }
    };

    let result = match populate(&staged, fetcher, spec).await {
        Ok(()) => data_dir.promote(&staged).map(drop),
        Err(e) => Err(e),
    };
    if result.is_err() {
        tracing::warn!("Install of {} failed, removing staged files", id);
        discard(data_dir, &staged);
    }

    drop(lock);
    result
}

fn discard(data_dir: &DataDir, staged: &Instance) {
    if let Err(e) = data_dir.discard(staged) {
        tracing::warn!(
            "Failed to remove staging directory {}: {}",
            staged.path().display(),
            e
        );
    }
}

async fn populate<F: SourceFetcher>(
    instance: &Instance,
    fetcher: &F,
    spec: &InstallSpec,
) -> Result<()> {
    let request = FetchRequest {
        url: &spec.url,
        version: spec.version.as_deref(),
        profile: &spec.profile,
    };
    fetcher.fetch(request, instance.path()).await?;

    let compose = ComposeFile::parse_file(&instance.compose_path())?;
    if !compose.supports_profile(&spec.profile) {
        return Err(KeelError::ProfileNotFound {
            profile: spec.profile.clone(),
            repository: spec.url.clone(),
        });
    }
    tracing::debug!(
        "Profile {} activates services {:?}",
        spec.profile,
        compose.services_for(Some(&spec.profile))
    );

    instance.write_metadata(&InstanceMetadata {
        name: repository_name(&spec.url)?,
        url: spec.url.clone(),
        version: spec.version.clone(),
        tag: spec.tag.clone(),
        profile: spec.profile.clone(),
        installed_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::COMPOSE_FILE_NAME;
    use crate::command::testing::FakeRunner;
    use crate::lifecycle::test_support::{Fixture, PROFILE};
    use crate::lifecycle::{start, state, InstanceState};
    use crate::source::RepositoryFetcher;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    /// Fetcher that takes a while before copying anything
    struct SlowFetcher<'a> {
        inner: &'a RepositoryFetcher<FakeRunner>,
        delay: Duration,
    }

    impl SourceFetcher for SlowFetcher<'_> {
        async fn fetch(&self, request: FetchRequest<'_>, dest: &Path) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.fetch(request, dest).await
        }
    }

    #[tokio::test]
    async fn test_install_writes_instance() {
        let fx = Fixture::new();

        let id = fx.install().await;

        assert_eq!(id, "mock-avs-default");
        let instance = fx.data.resolve(&id).unwrap();
        assert!(instance.compose_path().is_file());
        assert!(instance.path().join(".env").is_file());

        let metadata = instance.metadata().unwrap();
        assert_eq!(metadata.name, "mock-avs");
        assert_eq!(metadata.profile, PROFILE);
        assert_eq!(metadata.tag, DEFAULT_TAG);
        assert_eq!(metadata.url, fx.repo_url);

        // Install never touches containers
        assert!(fx.runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_install_with_tag() {
        let fx = Fixture::new();
        let spec = fx.spec().tag("second");

        let id = install(&fx.data, &fx.fetcher, fx.policy, &spec).await.unwrap();

        assert_eq!(id, "mock-avs-second");
        assert_eq!(fx.data.list().unwrap(), vec!["mock-avs-second"]);
    }

    #[tokio::test]
    async fn test_install_existing_id_fails() {
        let fx = Fixture::new();
        let id = fx.install().await;
        let before = fs::read_to_string(fx.data.resolve(&id).unwrap().metadata_path()).unwrap();

        let err = install(&fx.data, &fx.fetcher, fx.policy, &fx.spec())
            .await
            .unwrap_err();

        assert!(matches!(err.root(), KeelError::InstanceExists(existing) if existing == &id));
        // The existing instance is left alone
        let after = fs::read_to_string(fx.data.resolve(&id).unwrap().metadata_path()).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_unknown_profile_rolls_back() {
        let fx = Fixture::new();
        let spec = InstallSpec::new(&fx.repo_url, "health-checker");

        let err = install(&fx.data, &fx.fetcher, fx.policy, &spec)
            .await
            .unwrap_err();

        assert!(matches!(err.root(), KeelError::ProfileNotFound { .. }));
        assert!(err.to_string().starts_with("install mock-avs-default:"));
        assert!(fx.data.list().unwrap().is_empty());
        // No staging directory is left behind either
        assert_eq!(fs::read_dir(fx.data.root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_profile_not_declared_in_compose_file() {
        let fx = Fixture::new();
        let other = fx.temp.path().join("mock-avs/pkg/other");
        fs::create_dir_all(&other).unwrap();
        fs::copy(
            fx.temp.path().join("mock-avs/pkg").join(PROFILE).join(COMPOSE_FILE_NAME),
            other.join(COMPOSE_FILE_NAME),
        )
        .unwrap();

        let err = install(&fx.data, &fx.fetcher, fx.policy, &InstallSpec::new(&fx.repo_url, "other"))
            .await
            .unwrap_err();

        assert!(matches!(err.root(), KeelError::ProfileNotFound { profile, .. } if profile == "other"));
        assert!(!fx.data.contains("mock-avs-default"));
    }

    #[tokio::test]
    async fn test_unreachable_source() {
        let fx = Fixture::new();
        let spec = InstallSpec::new("https://example.invalid/org/mock-avs", PROFILE);

        let err = install(&fx.data, &fx.fetcher, fx.policy, &spec)
            .await
            .unwrap_err();

        assert!(matches!(err.root(), KeelError::SourceUnavailable(_)));
        assert!(fx.data.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_compose_file_rolls_back() {
        let fx = Fixture::new();
        fs::write(
            fx.temp.path().join("mock-avs/pkg").join(PROFILE).join(COMPOSE_FILE_NAME),
            "services: [",
        )
        .unwrap();

        let err = install(&fx.data, &fx.fetcher, fx.policy, &fx.spec())
            .await
            .unwrap_err();

        assert!(matches!(err.root(), KeelError::ComposeParse(_)));
        assert!(fx.data.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_in_progress_is_not_visible() {
        let fx = Fixture::new();
        let fetcher = SlowFetcher {
            inner: &fx.fetcher,
            delay: Duration::from_millis(300),
        };
        let spec = fx.spec();

        let installing = install(&fx.data, &fetcher, fx.policy, &spec);
        let observe = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let listed = fx.data.list().unwrap();
            let current = state(&fx.data, &fx.compose, "mock-avs-default").await.unwrap();
            let started = start(&fx.data, &fx.compose, fx.policy, "mock-avs-default").await;
            (listed, current, started)
        };
        let (installed, (listed, current, started)) = tokio::join!(installing, observe);

        assert!(listed.is_empty());
        assert_eq!(current, InstanceState::Uninstalled);
        assert!(started.unwrap_err().is_not_found());
        assert!(fx.runner.invocations().is_empty());

        assert_eq!(installed.unwrap(), "mock-avs-default");
        assert_eq!(fx.data.list().unwrap(), vec!["mock-avs-default"]);
    }
}
