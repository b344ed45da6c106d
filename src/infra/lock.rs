// ============================================================
// Layer 6 — Checkpoint Directory Lock
// ============================================================
// One training run owns an output directory at a time. The lock
// is a `.lock` file created with create-new semantics and holding
// the owner's PID; it is removed when the guard drops.
//
// A stale lock left by a killed process must be removed by hand.

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::infra::checkpoint::CheckpointError;

pub const LOCK_FILE: &str = ".lock";

#[derive(Debug)]
pub struct DirectoryLock {
    path: PathBuf,
}

impl DirectoryLock {
    /// Take exclusive ownership of `dir`, failing if another run holds it.
    pub fn acquire(dir: &Path) -> Result<Self, CheckpointError> {
        let path = dir.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| match source.kind() {
                ErrorKind::AlreadyExists => CheckpointError::Locked { path: path.clone() },
                _ => CheckpointError::Io { path: path.clone(), source },
            })?;

        writeln!(file, "{}", std::process::id())
            .map_err(|source| CheckpointError::Io { path: path.clone(), source })?;

        tracing::debug!("Acquired '{}'", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Could not release '{}': {}", self.path.display(), e);
        }
    }
}
