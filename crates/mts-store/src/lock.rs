//! Per-topic reader/writer locks.
//!
//! Locks are keyed by the absolute path of the topic's log file, so the same
//! topic under two different roots never shares a lock. The registry only
//! keeps weak handles: a lock lives as long as some operation holds it, and
//! dead entries are pruned as the map grows.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::error::{StoreError, StoreResult};

/// Shared lock guarding one topic log file.
pub type TopicLock = Arc<RwLock<()>>;

/// Smallest map size at which dead entries are pruned.
const MIN_PRUNE_AT: usize = 64;

#[derive(Debug)]
struct Registry {
    locks: HashMap<PathBuf, Weak<RwLock<()>>>,
    /// Prune before inserting once the map holds this many entries.
    prune_at: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            locks: HashMap::new(),
            prune_at: MIN_PRUNE_AT,
        }
    }
}

/// Registry handing out one [`TopicLock`] per log file path.
///
/// Every caller that holds a lock for a path at the same time gets the same
/// lock. Once all holders drop it, the entry is dead and gets pruned.
#[derive(Debug, Default)]
pub struct LockRegistry {
    inner: Mutex<Registry>,
}

impl LockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `path`, created if no live lock exists.
    pub fn lock_for(&self, path: &Path) -> StoreResult<TopicLock> {
        let mut registry = self
            .inner
            .lock()
            .map_err(|_| StoreError::poisoned("lock registry"))?;

        if let Some(lock) = registry.locks.get(path).and_then(Weak::upgrade) {
            return Ok(lock);
        }

        if registry.locks.len() >= registry.prune_at {
            registry.locks.retain(|_, lock| lock.strong_count() > 0);
            registry.prune_at = (registry.locks.len() * 2).max(MIN_PRUNE_AT);
        }

        let lock = Arc::new(RwLock::new(()));
        registry
            .locks
            .insert(path.to_path_buf(), Arc::downgrade(&lock));
        Ok(lock)
    }

    /// Number of entries in the map, live or not yet pruned.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|registry| registry.locks.len())
            .unwrap_or(0)
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
