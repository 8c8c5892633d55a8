//! Stop: halt an instance's containers without removing them

use crate::command::CommandRunner;
use crate::compose::{ComposeManager, ComposeStopOptions};
use crate::data::{DataDir, LockPolicy};
use crate::error::{Phase, Result};

/// Stop the instance `id`
pub async fn stop<R: CommandRunner>(
    data_dir: &DataDir,
    compose: &ComposeManager<R>,
    policy: LockPolicy,
    id: &str,
) -> Result<()> {
    stop_instance(data_dir, compose, policy, id)
        .await
        .map_err(|e| e.in_phase(Phase::Stop, id))
}

async fn stop_instance<R: CommandRunner>(
    data_dir: &DataDir,
    compose: &ComposeManager<R>,
    policy: LockPolicy,
    id: &str,
) -> Result<()> {
    let instance = data_dir.resolve(id)?;
    let _lock = instance.lock(policy).await?;

    let profile = instance.profile()?;
    let compose_path = instance.compose_path();

    tracing::info!("Stopping instance {}", id);
    compose
        .stop(ComposeStopOptions {
            path: &compose_path,
            profile: profile.as_deref(),
        })
        .await?;
    tracing::info!("Instance {} stopped", id);

    Ok(())
}
