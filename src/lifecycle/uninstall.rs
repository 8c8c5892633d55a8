//! Uninstall: tear an instance's containers down and delete its directory

use crate::command::CommandRunner;
use crate::compose::{ComposeDownOptions, ComposeManager};
use crate::data::{DataDir, LockPolicy};
use crate::error::{Phase, Result};

/// Uninstall the instance `id`; returns whether an instance was removed.
///
/// An id that is not installed only produces a warning: uninstall succeeds
/// whenever the instance is absent afterwards. A failed teardown leaves the
/// directory in place so the uninstall can be retried.
pub async fn uninstall<R: CommandRunner>(
    data_dir: &DataDir,
    compose: &ComposeManager<R>,
    policy: LockPolicy,
    id: &str,
) -> Result<bool> {
    match uninstall_instance(data_dir, compose, policy, id).await {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => {
            tracing::warn!("Instance {} is not installed, nothing to uninstall", id);
            Ok(false)
        }
        Err(e) => Err(e.in_phase(Phase::Uninstall, id)),
    }
}

async fn uninstall_instance<R: CommandRunner>(
    data_dir: &DataDir,
    compose: &ComposeManager<R>,
    policy: LockPolicy,
    id: &str,
) -> Result<()> {
    let instance = data_dir.resolve(id)?;
    let lock = instance.lock(policy).await?;

    let profile = instance.profile().unwrap_or_else(|e| {
        tracing::warn!("Unreadable metadata for {} ({}), tearing down without profile", id, e);
        None
    });
    let compose_path = instance.compose_path();

    tracing::info!("Uninstalling instance {}", id);
    if compose_path.is_file() {
        compose
            .down(ComposeDownOptions {
                path: &compose_path,
                profile: profile.as_deref(),
            })
            .await?;
    } else {
        tracing::warn!("Instance {} has no compose file, skipping teardown", id);
    }

    data_dir.remove(id)?;
    drop(lock);
    tracing::info!("Instance {} uninstalled", id);

    Ok(())
}
