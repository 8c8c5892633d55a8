//! Live instance state

use crate::command::CommandRunner;
use crate::compose::{ComposeManager, ComposePsOptions};
use crate::data::DataDir;
use crate::error::Result;
use std::fmt;

/// Lifecycle state of an instance.
///
/// Derived on every call from the data directory and the orchestration tool;
/// it is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// No instance directory
    Uninstalled,
    /// Installed, no service running
    Stopped,
    /// Installed with at least one service running
    Running,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceState::Uninstalled => write!(f, "uninstalled"),
            InstanceState::Stopped => write!(f, "stopped"),
            InstanceState::Running => write!(f, "running"),
        }
    }
}

/// Query the current state of `id`. Takes no lock.
pub async fn state<R: CommandRunner>(
    data_dir: &DataDir,
    compose: &ComposeManager<R>,
    id: &str,
) -> Result<InstanceState> {
    let instance = match data_dir.resolve(id) {
        Ok(instance) => instance,
        Err(e) if e.is_not_found() => return Ok(InstanceState::Uninstalled),
        Err(e) => return Err(e),
    };

    let compose_path = instance.compose_path();
    if !compose_path.is_file() {
        return Ok(InstanceState::Stopped);
    }

    let profile = instance.profile()?;
    let running = compose
        .ps(ComposePsOptions {
            path: &compose_path,
            profile: profile.as_deref(),
        })
        .await?;

    Ok(if running.is_empty() {
        InstanceState::Stopped
    } else {
        InstanceState::Running
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::test_support::Fixture;
    use crate::lifecycle::{start, stop};

    #[tokio::test]
    async fn test_state_follows_lifecycle() {
        let fx = Fixture::new();
        assert_eq!(
            state(&fx.data, &fx.compose, "mock-avs-default").await.unwrap(),
            InstanceState::Uninstalled
        );

        let id = fx.install().await;
        assert_eq!(state(&fx.data, &fx.compose, &id).await.unwrap(), InstanceState::Stopped);

        start(&fx.data, &fx.compose, fx.policy, &id).await.unwrap();
        assert_eq!(state(&fx.data, &fx.compose, &id).await.unwrap(), InstanceState::Running);

        stop(&fx.data, &fx.compose, fx.policy, &id).await.unwrap();
        assert_eq!(state(&fx.data, &fx.compose, &id).await.unwrap(), InstanceState::Stopped);
    }
}
