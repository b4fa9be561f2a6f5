use std::ffi::OsString;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use mts_store::{RootResolver, StoreConfig, SyncMode, TopicStore};

use crate::error::{ServerError, ServerResult};

/// Environment variable supplying the initial storage root.
pub const DATA_PATH_ENV: &str = "METRICS_STORE_DATAPATH";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Storage root applied before the first request. `None` leaves the
    /// store unconfigured until `/configure` is called.
    pub data_root: Option<PathBuf>,
    pub sync_every_write: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            data_root: None,
            sync_every_write: false,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Overlay the data root from [`DATA_PATH_ENV`], if set and non-empty.
    pub fn apply_env(self) -> Self {
        self.with_data_root_from(std::env::var_os(DATA_PATH_ENV))
    }

    fn with_data_root_from(mut self, value: Option<OsString>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.data_root = Some(PathBuf::from(value));
        }
        self
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            sync_mode: if self.sync_every_write {
                SyncMode::EveryWrite
            } else {
                SyncMode::OsDefault
            },
        }
    }

    /// Build the topic store described by this config.
    pub fn build_store(&self) -> ServerResult<TopicStore> {
        let resolver = match &self.data_root {
            Some(root) => RootResolver::with_root(root)?,
            None => RootResolver::unconfigured(),
        };
        Ok(TopicStore::new(resolver, self.store_config()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert!(c.data_root.is_none());
        assert!(!c.sync_every_write);
        assert_eq!(c.store_config().sync_mode, SyncMode::OsDefault);
    }

    #[test]
    fn parse_toml_with_defaults() {
        let c = ServerConfig::from_toml_str(
            r#"
            data_root = "/var/lib/metrics"
            sync_every_write = true
            "#,
        )
        .unwrap();
        assert_eq!(c.data_root, Some(PathBuf::from("/var/lib/metrics")));
        assert_eq!(c.bind_addr, ServerConfig::default().bind_addr);
        assert_eq!(c.store_config().sync_mode, SyncMode::EveryWrite);
    }

    #[test]
    fn reject_bad_toml() {
        let err = ServerConfig::from_toml_str("bind_addr = 12").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn env_value_overrides_data_root() {
        let c = ServerConfig::default().with_data_root_from(Some("/srv/metrics".into()));
        assert_eq!(c.data_root, Some(PathBuf::from("/srv/metrics")));

        let c = c.with_data_root_from(Some(OsString::new()));
        assert_eq!(c.data_root, Some(PathBuf::from("/srv/metrics")));

        let c = ServerConfig::default().with_data_root_from(None);
        assert!(c.data_root.is_none());
    }

    #[test]
    fn build_store_applies_data_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_root: Some(dir.path().to_path_buf()),
            ..ServerConfig::default()
        };
        let store = config.build_store().unwrap();
        assert!(store.root().is_some());

        let store = ServerConfig::default().build_store().unwrap();
        assert!(store.root().is_none());
    }
}
