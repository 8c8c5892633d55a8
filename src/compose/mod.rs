//! Docker Compose integration
//!
//! Keel never interprets a compose file beyond a sanity check at install
//! time; bringing containers up and down is delegated to the external
//! orchestration tool.

pub mod file;
pub mod manager;

pub use file::ComposeFile;
pub use manager::{
    ComposeDownOptions, ComposeManager, ComposePsOptions, ComposeStopOptions, ComposeUpOptions,
};

/// File name of the compose specification inside an instance directory
pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";
