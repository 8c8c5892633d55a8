//! Installed instance handle

use super::lock::{self, InstanceLock, LockPolicy};
use crate::compose::COMPOSE_FILE_NAME;
use crate::error::{KeelError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the installation record inside an instance directory
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Installation record written by `install`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    /// Repository name the id was derived from
    pub name: String,
    /// Repository URL or local path
    pub url: String,
    /// Git ref the profile was taken from, `None` for the default branch
    pub version: Option<String>,
    pub tag: String,
    pub profile: String,
    pub installed_at: DateTime<Utc>,
}

/// One installed instance, backed by `<data-dir>/<id>/`
#[derive(Debug, Clone)]
pub struct Instance {
    id: String,
    path: PathBuf,
}

impl Instance {
    pub(crate) fn new(id: &str, path: PathBuf) -> Self {
        Self {
            id: id.to_string(),
            path,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Instance directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn compose_path(&self) -> PathBuf {
        self.path.join(COMPOSE_FILE_NAME)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(METADATA_FILE_NAME)
    }

    pub(crate) fn lock_path(&self) -> PathBuf {
        lock::lock_path(&self.path)
    }

    /// Take the instance's exclusive lock
    pub async fn lock(&self, policy: LockPolicy) -> Result<InstanceLock> {
        InstanceLock::acquire(self, policy).await
    }

    /// Read the installation record
    pub fn metadata(&self) -> Result<InstanceMetadata> {
        let content = fs::read_to_string(self.metadata_path())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Profile recorded at install time, `None` before metadata is written
    pub fn profile(&self) -> Result<Option<String>> {
        match self.metadata() {
            Ok(metadata) => Ok(Some(metadata.profile)),
            Err(KeelError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write the installation record, replacing any previous one atomically
    pub fn write_metadata(&self, metadata: &InstanceMetadata) -> Result<()> {
        let staging = self.path.join(format!(".{}.tmp", METADATA_FILE_NAME));
        fs::write(&staging, serde_json::to_vec_pretty(metadata)?)?;
        fs::rename(&staging, self.metadata_path())?;
        Ok(())
    }
}

/// Check that `id` is usable as a directory name under the data directory
pub fn validate_instance_id(id: &str) -> Result<()> {
    let valid = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,254}$").is_ok_and(|re| re.is_match(id));
    if valid {
        Ok(())
    } else {
        Err(KeelError::InvalidInstanceId(id.to_string()))
    }
}

/// Instance id for a repository and tag: `<repository-name>-<tag>`
pub fn instance_id(repository_name: &str, tag: &str) -> Result<String> {
    let id = format!("{}-{}", repository_name, tag);
    validate_instance_id(&id)?;
    Ok(id)
}
