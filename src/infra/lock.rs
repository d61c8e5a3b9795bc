//! Advisory file lock serializing imports across processes.

use crate::error::AppError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive lock held for the lifetime of the value.
#[derive(Debug)]
pub struct ImportLock {
    file: File,
    path: PathBuf,
}

impl ImportLock {
    /// Try to take the lock without waiting. A held lock yields `AppError::Locked`.
    pub fn acquire(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Io(e.to_string()))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| AppError::Io(format!("{}: {}", path.display(), e)))?;
        if let Err(e) = FileExt::try_lock_exclusive(&file) {
            return Err(if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                AppError::Locked(path.display().to_string())
            } else {
                AppError::Io(format!("{}: {}", path.display(), e))
            });
        }
        log::debug!("Acquired import lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Lock file that guards imports into the database at `db_path`.
    pub fn path_for(db_path: &Path) -> PathBuf {
        let mut name = db_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ImportLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("Releasing import lock {} failed: {}", self.path.display(), e);
        }
    }
}
