//! Storage root resolution.
//!
//! A [`StoreRoot`] is always absolute, lexically cleaned, and ends with
//! exactly one trailing separator. The [`RootResolver`] holds the active root
//! and is injected into the store; reconfiguring it switches the root for
//! subsequent operations without touching files under the previous one.

use std::fmt;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR_STR};
use std::sync::{PoisonError, RwLock};

use tracing::info;

use crate::error::{StoreError, StoreResult};

/// Absolute directory under which every topic log file lives.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoreRoot(PathBuf);

impl StoreRoot {
    /// Resolve a raw, possibly relative path into a normalized root.
    ///
    /// Relative paths are resolved against the current working directory.
    /// The directory does not need to exist yet.
    pub fn resolve(raw: impl AsRef<Path>) -> StoreResult<Self> {
        let raw = raw.as_ref();
        if raw.as_os_str().is_empty() {
            return Err(StoreError::InvalidPath {
                path: String::new(),
                reason: "path must not be empty".into(),
            });
        }

        let absolute = std::path::absolute(raw).map_err(|e| StoreError::InvalidPath {
            path: raw.display().to_string(),
            reason: format!("cannot make path absolute: {e}"),
        })?;

        let mut normalized = clean(&absolute).into_os_string();
        if !normalized
            .as_encoded_bytes()
            .ends_with(MAIN_SEPARATOR_STR.as_bytes())
        {
            normalized.push(MAIN_SEPARATOR_STR);
        }
        Ok(Self(PathBuf::from(normalized)))
    }

    /// The root directory, including its trailing separator.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Path of `file_name` directly under this root.
    pub fn join(&self, file_name: &str) -> PathBuf {
        self.0.join(file_name)
    }
}

impl fmt::Display for StoreRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Lexically remove `.` and `..` components and redundant separators.
///
/// `..` at the filesystem root stays at the root.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Holder of the active [`StoreRoot`].
#[derive(Debug, Default)]
pub struct RootResolver {
    root: RwLock<Option<StoreRoot>>,
}

impl RootResolver {
    /// A resolver with no root; every store operation fails until configured.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// A resolver configured with `raw` from the start.
    pub fn with_root(raw: impl AsRef<Path>) -> StoreResult<Self> {
        let root = StoreRoot::resolve(raw)?;
        Ok(Self {
            root: RwLock::new(Some(root)),
        })
    }

    /// Resolve `raw` and make it the active root.
    ///
    /// Operations already in flight keep the root they captured.
    pub fn configure(&self, raw: impl AsRef<Path>) -> StoreResult<StoreRoot> {
        let root = StoreRoot::resolve(raw)?;
        let mut slot = self.root.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(root.clone());
        info!(root = %root, "store root configured");
        Ok(root)
    }

    /// The active root, or `None` before the first configuration.
    pub fn current(&self) -> Option<StoreRoot> {
        self.root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The active root, or [`StoreError::NotConfigured`].
    pub fn require(&self) -> StoreResult<StoreRoot> {
        self.current().ok_or(StoreError::NotConfigured)
    }
}
