//! Error types for Keel

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for Keel operations
pub type Result<T> = std::result::Result<T, KeelError>;

/// Lifecycle phase an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Install,
    Start,
    Stop,
    Uninstall,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Install => write!(f, "install"),
            Phase::Start => write!(f, "start"),
            Phase::Stop => write!(f, "stop"),
            Phase::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// Keel error types
#[derive(Error, Debug)]
pub enum KeelError {
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Instance already exists: {0}")]
    InstanceExists(String),

    #[error("Invalid instance id: {0:?}")]
    InvalidInstanceId(String),

    #[error("Timed out after {waited:?} waiting for the lock on instance {instance}")]
    LockTimeout { instance: String, waited: Duration },

    #[error("Orchestration tool failed ({}): {}", exit_label(.exit_code), .stderr.trim())]
    OrchestrationFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to launch {program}: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Profile {profile} not found in {repository}")]
    ProfileNotFound { profile: String, repository: String },

    #[error("Compose file parse error: {0}")]
    ComposeParse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{phase} {instance}: {source}")]
    Operation {
        phase: Phase,
        instance: String,
        #[source]
        source: Box<KeelError>,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl KeelError {
    /// Attach the lifecycle phase and instance id to an error
    pub fn in_phase(self, phase: Phase, instance: &str) -> Self {
        KeelError::Operation {
            phase,
            instance: instance.to_string(),
            source: Box::new(self),
        }
    }

    /// The underlying error with any phase wrappers removed
    pub fn root(&self) -> &KeelError {
        match self {
            KeelError::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), KeelError::InstanceNotFound(_))
    }
}
