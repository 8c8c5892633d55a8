//! On-disk instance state
//!
//! The data directory holds one subdirectory per installed instance. The
//! existence of that directory is the only record of an instance being
//! installed. Installs are assembled in a hidden staging directory and
//! renamed into place once complete.

pub mod instance;
pub mod lock;

pub use instance::{instance_id, validate_instance_id, Instance, InstanceMetadata};
pub use lock::{InstanceLock, LockPolicy};

use crate::error::{KeelError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Prefix of staging directories; never a valid instance id
const STAGING_PREFIX: &str = ".install-";

/// Data directory
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Open the data directory, creating it if needed
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handle for an installed instance
    pub fn resolve(&self, id: &str) -> Result<Instance> {
        validate_instance_id(id)?;
        let path = self.root.join(id);
        if !path.is_dir() {
            return Err(KeelError::InstanceNotFound(id.to_string()));
        }
        Ok(Instance::new(id, path))
    }

    /// Whether `id` is installed
    pub fn contains(&self, id: &str) -> bool {
        self.resolve(id).is_ok()
    }

    /// Ids of all installed instances, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_instance_id(&name).is_ok() {
                ids.push(name);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Create the directory for a new instance
    pub fn create(&self, id: &str) -> Result<Instance> {
        validate_instance_id(id)?;
        let path = self.root.join(id);
        fs::create_dir(&path).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => KeelError::InstanceExists(id.to_string()),
            _ => KeelError::Io(e),
        })?;
        tracing::debug!("Created instance directory {}", path.display());
        Ok(Instance::new(id, path))
    }

    /// Create a private staging directory for installing `id`.
    ///
    /// The staging directory is invisible to [`DataDir::list`] and
    /// [`DataDir::resolve`] until [`DataDir::promote`] renames it into place.
    pub fn stage(&self, id: &str) -> Result<Instance> {
        validate_instance_id(id)?;
        let path = self
            .root
            .join(format!("{}{}-{}", STAGING_PREFIX, id, Uuid::new_v4()));
        fs::create_dir(&path)?;
        tracing::debug!("Staging instance {} in {}", id, path.display());
        Ok(Instance::new(id, path))
    }

    /// Rename a staged instance to its final directory.
    ///
    /// Fails with [`KeelError::InstanceExists`] if `<root>/<id>` is already
    /// installed; the rename never replaces a populated directory.
    pub fn promote(&self, staged: &Instance) -> Result<Instance> {
        let target = self.root.join(staged.id());
        let exists = || KeelError::InstanceExists(staged.id().to_string());
        if target.exists() {
            return Err(exists());
        }
        fs::rename(staged.path(), &target).map_err(|e| {
            if target.exists() {
                exists()
            } else {
                KeelError::Io(e)
            }
        })?;
        tracing::debug!("Promoted {} to {}", staged.path().display(), target.display());
        Ok(Instance::new(staged.id(), target))
    }

    /// Delete a staging directory left by a failed install
    pub fn discard(&self, staged: &Instance) -> Result<()> {
        fs::remove_dir_all(staged.path())?;
        Ok(())
    }

    /// Delete an instance directory and everything in it
    pub fn remove(&self, id: &str) -> Result<()> {
        let instance = self.resolve(id)?;
        fs::remove_dir_all(instance.path()).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => KeelError::InstanceNotFound(id.to_string()),
            _ => KeelError::Io(e),
        })?;
        tracing::debug!("Removed instance directory {}", instance.path().display());
        Ok(())
    }
}
