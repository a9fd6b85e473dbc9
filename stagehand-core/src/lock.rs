//! Single-instance guard.

use crate::errors::{InstallError, InstallResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive advisory lock held for the lifetime of an install.
///
/// The lock is released when the value is dropped (the descriptor closes).
#[derive(Debug)]
pub struct InstallLock {
    _file: File,
    path: PathBuf,
}

impl InstallLock {
    /// Take the lock at `path` without blocking.
    pub fn acquire(path: &Path) -> InstallResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                InstallError::Precondition(format!(
                    "cannot create lock directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        // The file is never unlinked: removing a locked file would let a second
        // process lock a fresh inode at the same path.
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                InstallError::Precondition(format!(
                    "cannot open lock file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        if file.try_lock_exclusive().is_err() {
            return Err(InstallError::AlreadyRunning(path.to_path_buf()));
        }

        log::debug!("holding install lock {}", path.display());
        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_lock_is_refused_until_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run/stagehand.lock");

        let first = InstallLock::acquire(&path).unwrap();
        assert_eq!(first.path(), path.as_path());

        let err = InstallLock::acquire(&path).unwrap_err();
        assert!(matches!(err, InstallError::AlreadyRunning(p) if p == path));

        drop(first);
        InstallLock::acquire(&path).unwrap();
    }
}
