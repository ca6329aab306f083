use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One deployment per project directory at a time.
///
/// Locks are keyed by the canonical project path, so `./site` and
/// `/home/me/site` contend for the same lock.
#[derive(Debug, Clone, Default)]
pub struct DeployLocks {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>,
}

impl DeployLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `project` without waiting; `None` if a deployment
    /// already holds it. The lock is released when the guard drops.
    pub fn try_acquire(&self, project: &Path) -> Option<OwnedMutexGuard<()>> {
        let key = project
            .canonicalize()
            .unwrap_or_else(|_| project.to_path_buf());
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(key).or_default().clone()
        };
        lock.try_lock_owned().ok()
    }
}
