use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// Per-target mutual exclusion.
///
/// A session holds its target's guard from before the first append until
/// cleanup has finished, so two jobs for one remote path never share a
/// staging artifact or race on the rename. Entries are dropped once no job
/// holds or waits for them.
#[derive(Default)]
pub struct PathLocks {
    locks: Mutex<LockMap>,
}

/// Exclusive access to one path. Releases on drop.
pub struct PathGuard<'a> {
    locks: &'a PathLocks,
    path: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for exclusive access to `path`.
    pub async fn lock(&self, path: &str) -> PathGuard<'_> {
        let lock = Arc::clone(self.map().entry(path.to_string()).or_default());
        let guard = lock.lock_owned().await;
        PathGuard {
            locks: self,
            path: path.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of paths currently tracked.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut map = self.locks.map();
        // Only the map's own reference left: nobody holds or awaits it.
        if map
            .get(&self.path)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.path);
        }
    }
}
