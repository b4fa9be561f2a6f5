use std::sync::Arc;

use tokio::net::TcpListener;

use mts_store::TopicStore;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// HTTP front end for a [`TopicStore`].
pub struct MetricsServer {
    config: ServerConfig,
    store: Arc<TopicStore>,
}

impl MetricsServer {
    /// Build the server and its store from `config`.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store = Arc::new(config.build_store()?);
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TopicStore> {
        &self.store
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.store))
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        match self.store.root() {
            Some(root) => tracing::info!(%root, "using configured data path"),
            None => tracing::info!("data path not set, waiting for a call to /configure"),
        }
        tracing::info!("metrics store listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
