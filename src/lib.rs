//! Keel - local instance lifecycle manager
//!
//! Keel installs service instances defined by compose files and drives them
//! through their lifecycle with an external orchestration tool:
//!
//! - Install an instance from a repository profile
//! - Start, stop and uninstall it by `<repository-name>-<tag>`
//! - Serialize operations on one instance with a per-instance file lock
//! - Keep all state on disk, one directory per instance

pub mod command;
pub mod compose;
pub mod config;
pub mod daemon;
pub mod data;
pub mod error;
pub mod lifecycle;
pub mod source;

pub use daemon::Daemon;
pub use error::{KeelError, Result};
