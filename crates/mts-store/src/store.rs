use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::lock::LockRegistry;
use crate::log::{SyncMode, TopicLog, TopicReader};
use crate::names;
use crate::root::{RootResolver, StoreRoot};

/// Tunables fixed at store construction.
#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    /// Sync strategy applied to every topic log.
    pub sync_mode: SyncMode,
}

/// Facade over the topic logs under one storage root.
///
/// Every operation captures the active root once, checks that a root is
/// configured before touching the filesystem, and then works against that
/// root only. Appends to one topic are serialized; operations on different
/// topics never block each other.
#[derive(Debug)]
pub struct TopicStore {
    resolver: RootResolver,
    locks: LockRegistry,
    config: StoreConfig,
}

impl TopicStore {
    /// Create a store around an existing resolver.
    pub fn new(resolver: RootResolver, config: StoreConfig) -> Self {
        Self {
            resolver,
            locks: LockRegistry::new(),
            config,
        }
    }

    /// A store with no root; every operation fails with `NotConfigured`.
    pub fn unconfigured() -> Self {
        Self::new(RootResolver::unconfigured(), StoreConfig::default())
    }

    /// A store rooted at `root` with the default configuration.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(RootResolver::with_root(root)?, StoreConfig::default()))
    }

    /// The active root, if configured.
    pub fn root(&self) -> Option<StoreRoot> {
        self.resolver.current()
    }

    /// Switch to a new root. Files under the previous root are left alone.
    pub fn reconfigure(&self, raw: impl AsRef<Path>) -> StoreResult<StoreRoot> {
        self.resolver.configure(raw)
    }

    /// Create a new, empty topic.
    pub fn create_topic(&self, name: &str) -> StoreResult<()> {
        self.topic_log(name)?.create()
    }

    /// Append one serialized record to an existing topic.
    pub fn append(&self, name: &str, record: &[u8]) -> StoreResult<()> {
        self.topic_log(name)?.append(record)
    }

    /// Serialize `value` as a single line of JSON and append it.
    pub fn append_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> StoreResult<()> {
        let log = self.topic_log(name)?;
        let record =
            serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        log.append(&record)
    }

    /// Stream every record of a topic, oldest first.
    pub fn read_all(&self, name: &str) -> StoreResult<TopicReader> {
        self.topic_log(name)?.read_all()
    }

    /// The most recent record of a topic.
    pub fn read_last(&self, name: &str) -> StoreResult<Vec<u8>> {
        self.topic_log(name)?.read_last()
    }

    /// Whether a topic has been created under the active root.
    pub fn topic_exists(&self, name: &str) -> StoreResult<bool> {
        self.topic_log(name)?.exists()
    }

    /// Names of all topics under the active root, sorted lexicographically.
    ///
    /// Entries that are not topic log files are ignored.
    pub fn list_topics(&self) -> StoreResult<Vec<String>> {
        let root = self.resolver.require()?;
        let dir = root.as_path();
        let entries = fs::read_dir(dir).map_err(|e| StoreError::from_root_io(e, dir))?;

        let mut topics = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::from_root_io(e, dir))?;
            let file_name = entry.file_name();
            let Some(topic) = file_name.to_str().and_then(names::decode) else {
                continue;
            };
            match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => continue,
                Ok(_) => topics.push(topic.to_string()),
                Err(e) => {
                    warn!(topic, error = %e, "cannot inspect directory entry; skipping");
                }
            }
        }
        topics.sort();

        debug!(root = %root, count = topics.len(), "listed topics");
        Ok(topics)
    }

    fn topic_log(&self, name: &str) -> StoreResult<TopicLog> {
        let root = self.resolver.require()?;
        let file_name = names::encode(name)?;
        let path = root.join(&file_name);
        let lock = self.locks.lock_for(&path)?;
        Ok(TopicLog::new(name, path, lock, self.config.sync_mode))
    }
}
