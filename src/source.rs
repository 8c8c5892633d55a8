//! Materializing a repository profile into an instance directory
//!
//! A repository carries one directory per profile under `pkg/`. Installing
//! profile `p` copies the contents of `pkg/p/` (which must include the
//! compose file) into the new instance directory.

use crate::command::{CommandRunner, CommandSpec};
use crate::compose::COMPOSE_FILE_NAME;
use crate::data::instance::METADATA_FILE_NAME;
use crate::error::{KeelError, Result};
use std::fs;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;
use walkdir::WalkDir;

/// Directory inside a repository holding the profiles
pub const PROFILES_DIR: &str = "pkg";

/// Files an instance directory owns that a profile may not overwrite
const RESERVED_NAMES: &[&str] = &[".lock", METADATA_FILE_NAME];

/// What to fetch
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub version: Option<&'a str>,
    pub profile: &'a str,
}

/// Materializes a repository profile into a directory
pub trait SourceFetcher: Send + Sync {
    /// Copy the files of `request.profile` into `dest`, which already exists.
    ///
    /// Fails with [`KeelError::SourceUnavailable`] if the repository cannot
    /// be read and [`KeelError::ProfileNotFound`] if it has no such profile.
    fn fetch(&self, request: FetchRequest<'_>, dest: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// Name of a repository from its URL or path, e.g. `mock-avs` for
/// `https://github.com/NethermindEth/mock-avs.git`
pub fn repository_name(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        return Err(KeelError::SourceUnavailable(format!(
            "cannot derive a repository name from {:?}",
            url
        )));
    }
    Ok(name.to_string())
}

/// Fetches from a local checkout or clones with git
pub struct RepositoryFetcher<R> {
    runner: Arc<R>,
    git: String,
}

impl<R: CommandRunner> RepositoryFetcher<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self {
            runner,
            git: "git".to_string(),
        }
    }

    async fn clone_into(&self, request: FetchRequest<'_>, checkout: &Path) -> Result<()> {
        let mut spec = CommandSpec::new(&self.git).args(["clone", "--quiet", "--depth", "1"]);
        if let Some(version) = request.version {
            spec = spec.arg("--branch").arg(version);
        }
        spec = spec.arg(request.url).arg(checkout.to_string_lossy());

        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(KeelError::SourceUnavailable(format!(
                "cloning {} failed: {}",
                request.url,
                output.stderr.trim()
            )));
        }
        Ok(())
    }
}

impl<R: CommandRunner> SourceFetcher for RepositoryFetcher<R> {
    async fn fetch(&self, request: FetchRequest<'_>, dest: &Path) -> Result<()> {
        let local = Path::new(request.url);
        if local.is_dir() {
            if request.version.is_some() {
                tracing::warn!("Ignoring version for local source {}", request.url);
            }
            return copy_profile(local, request, dest);
        }

        let checkout = std::env::temp_dir().join(format!("keel-fetch-{}", Uuid::new_v4()));
        tracing::info!("Cloning {} into {}", request.url, checkout.display());
        let result = match self.clone_into(request, &checkout).await {
            Ok(()) => copy_profile(&checkout, request, dest),
            Err(e) => Err(e),
        };

        if checkout.exists() {
            if let Err(e) = fs::remove_dir_all(&checkout) {
                tracing::warn!("Failed to clean up {}: {}", checkout.display(), e);
            }
        }
        result
    }
}

/// Copy `<checkout>/pkg/<profile>/` into `dest`
pub fn copy_profile(checkout: &Path, request: FetchRequest<'_>, dest: &Path) -> Result<()> {
    let profile_dir = checkout.join(PROFILES_DIR).join(request.profile);
    let valid_name = !request.profile.is_empty() && !request.profile.contains(['/', '\\']);
    if !valid_name || !profile_dir.is_dir() {
        return Err(KeelError::ProfileNotFound {
            profile: request.profile.to_string(),
            repository: request.url.to_string(),
        });
    }

    for entry in WalkDir::new(&profile_dir).min_depth(1) {
        let entry = entry.map_err(|e| KeelError::SourceUnavailable(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(&profile_dir)
            .map_err(|e| KeelError::SourceUnavailable(e.to_string()))?;

        if entry.depth() == 1 && RESERVED_NAMES.iter().any(|r| entry.file_name() == *r) {
            tracing::warn!("Skipping reserved file {} in profile", relative.display());
            continue;
        }

        let target = dest.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }

    if !dest.join(COMPOSE_FILE_NAME).is_file() {
        return Err(KeelError::SourceUnavailable(format!(
            "profile {} of {} has no {}",
            request.profile, request.url, COMPOSE_FILE_NAME
        )));
    }
    Ok(())
}
