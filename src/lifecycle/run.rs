//! Start: bring an installed instance's containers up

use crate::command::CommandRunner;
use crate::compose::{ComposeManager, ComposeUpOptions};
use crate::data::{DataDir, LockPolicy};
use crate::error::{Phase, Result};

/// Start the instance `id`
pub async fn start<R: CommandRunner>(
    data_dir: &DataDir,
    compose: &ComposeManager<R>,
    policy: LockPolicy,
    id: &str,
) -> Result<()> {
    start_instance(data_dir, compose, policy, id)
        .await
        .map_err(|e| e.in_phase(Phase::Start, id))
}

async fn start_instance<R: CommandRunner>(
    data_dir: &DataDir,
    compose: &ComposeManager<R>,
    policy: LockPolicy,
    id: &str,
) -> Result<()> {
    let instance = data_dir.resolve(id)?;
    let _lock = instance.lock(policy).await?;

    let profile = instance.profile()?;
    let compose_path = instance.compose_path();

    tracing::info!("Starting instance {}", id);
    compose
        .up(ComposeUpOptions {
            path: &compose_path,
            profile: profile.as_deref(),
        })
        .await?;
    tracing::info!("Instance {} started", id);

    Ok(())
}
