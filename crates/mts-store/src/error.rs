use std::io;
use std::path::{Path, PathBuf};

/// Errors from topic store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No storage root has been configured yet.
    #[error("store root is not configured")]
    NotConfigured,

    /// The storage root could not be resolved.
    #[error("invalid store root {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The topic name violates the naming rules.
    #[error("invalid topic name {name:?}: {reason}")]
    InvalidTopicName { name: String, reason: String },

    /// The record cannot be stored as a single line.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// A topic with this name already exists.
    #[error("topic already exists: {topic}")]
    AlreadyExists { topic: String },

    /// The topic has never been created.
    #[error("topic not found: {topic}")]
    TopicNotFound { topic: String },

    /// The topic exists but holds no records.
    #[error("topic has no records: {topic}")]
    EmptyTopic { topic: String },

    /// The process lacks permission on the backing file or directory.
    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    /// Serialization of a record failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other I/O failure from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Classify an I/O error raised while operating on `topic`'s log file.
    ///
    /// `NotFound` and `AlreadyExists` become topic-level errors; permission
    /// failures keep the path; everything else stays an `Io` error.
    pub(crate) fn from_topic_io(err: io::Error, topic: &str, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => StoreError::TopicNotFound {
                topic: topic.to_string(),
            },
            io::ErrorKind::AlreadyExists => StoreError::AlreadyExists {
                topic: topic.to_string(),
            },
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => StoreError::Io(err),
        }
    }

    /// Classify an I/O error raised on the store root directory itself.
    pub(crate) fn from_root_io(err: io::Error, root: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                path: root.to_path_buf(),
            },
            _ => StoreError::Io(err),
        }
    }

    /// Error for a poisoned lock guarding a topic or the root.
    pub(crate) fn poisoned(what: &str) -> Self {
        StoreError::Io(io::Error::other(format!("{what} lock poisoned")))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
