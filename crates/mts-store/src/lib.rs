//! Topic log store for the Metrics Topic Store.
//!
//! Metric readings are grouped into named topics. Each topic is an
//! append-only file of newline-terminated records under a single storage
//! root, named `<topic>.topic.metrics.data.txt`. The store never interprets
//! record contents; by convention every record is one compact JSON value.
//!
//! # Components
//!
//! - [`root`] -- [`StoreRoot`] normalization and the reconfigurable [`RootResolver`]
//! - [`names`] -- topic name validation and the topic <-> filename mapping
//! - [`scan`] -- backward scan for the last line of a file
//! - [`lock`] -- per-topic reader/writer locks
//! - [`log`] -- [`TopicLog`], the append-only file for one topic
//! - [`store`] -- [`TopicStore`], the facade used by the server and CLI
//!
//! # Design Rules
//!
//! 1. Every operation fails with [`StoreError::NotConfigured`] before touching
//!    the filesystem when no root is set.
//! 2. Topic creation is exclusive and never truncates an existing log.
//! 3. Appends to one topic are serialized; different topics never contend.
//! 4. Reading the newest record costs O(record length), not O(file size).
//! 5. All I/O errors are classified and propagated, never swallowed.

pub mod error;
pub mod lock;
pub mod log;
pub mod names;
pub mod root;
pub mod scan;
pub mod store;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use log::{SyncMode, TopicLog, TopicReader};
pub use names::{decode, encode, validate_topic_name, TOPIC_FILE_SUFFIX};
pub use root::{RootResolver, StoreRoot};
pub use store::{StoreConfig, TopicStore};
