//! Per-instance advisory lock

use super::instance::Instance;
use crate::error::{KeelError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Interval between attempts while waiting under a timeout
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How long lock acquisition may wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockPolicy {
    /// Wait until the current holder releases the lock
    #[default]
    Block,
    /// Give up with [`KeelError::LockTimeout`] after the given duration
    Timeout(Duration),
}

impl From<Option<Duration>> for LockPolicy {
    fn from(timeout: Option<Duration>) -> Self {
        timeout.map_or(LockPolicy::Block, LockPolicy::Timeout)
    }
}

/// Exclusive hold on an instance's directory.
///
/// The lock is an `flock` on `<instance>/.lock` and is released when the
/// guard is dropped, whatever path the holder leaves by.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    instance: String,
    acquired: Instant,
}

impl InstanceLock {
    pub(crate) async fn acquire(instance: &Instance, policy: LockPolicy) -> Result<Self> {
        let started = Instant::now();
        let lock_path = instance.lock_path();

        loop {
            let file = open_lock_file(instance.id(), &lock_path)?;
            let file = match policy {
                LockPolicy::Block => lock_blocking(file).await?,
                LockPolicy::Timeout(limit) => {
                    lock_polling(file, instance.id(), started, limit).await?
                }
            };

            // An uninstall may have unlinked the file while we waited on it.
            if is_current(&file, &lock_path)? {
                tracing::debug!(
                    "Locked instance {} after {:?}",
                    instance.id(),
                    started.elapsed()
                );
                return Ok(Self {
                    file,
                    instance: instance.id().to_string(),
                    acquired: Instant::now(),
                });
            }
            tracing::debug!("Lock file of {} was replaced, retrying", instance.id());
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to unlock instance {}: {}", self.instance, e);
        }
        tracing::debug!(
            "Released instance {} after {:?}",
            self.instance,
            self.acquired.elapsed()
        );
    }
}

fn open_lock_file(instance: &str, path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => KeelError::InstanceNotFound(instance.to_string()),
            _ => KeelError::Io(e),
        })
}

async fn lock_blocking(file: File) -> Result<File> {
    tokio::task::spawn_blocking(move || file.lock_exclusive().map(|_| file))
        .await
        .map_err(|e| KeelError::Io(io::Error::new(io::ErrorKind::Other, e)))?
        .map_err(KeelError::Io)
}

async fn lock_polling(file: File, instance: &str, started: Instant, limit: Duration) -> Result<File> {
    let contended = fs2::lock_contended_error();
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(file),
            Err(e) if e.raw_os_error() == contended.raw_os_error() => {
                let waited = started.elapsed();
                if waited >= limit {
                    return Err(KeelError::LockTimeout {
                        instance: instance.to_string(),
                        waited,
                    });
                }
                tokio::time::sleep(POLL_INTERVAL.min(limit - waited)).await;
            }
            Err(e) => return Err(KeelError::Io(e)),
        }
    }
}

#[cfg(unix)]
fn is_current(file: &File, path: &Path) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file.metadata()?;
    match std::fs::metadata(path) {
        Ok(linked) => Ok(held.dev() == linked.dev() && held.ino() == linked.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(unix))]
fn is_current(_file: &File, path: &Path) -> Result<bool> {
    Ok(path.exists())
}

/// Lock file location for an instance directory
pub(crate) fn lock_path(instance_dir: &Path) -> PathBuf {
    instance_dir.join(".lock")
}
