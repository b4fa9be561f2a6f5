use axum::routing::{get, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all store endpoints.
pub fn build_router(store: AppState) -> Router {
    Router::new()
        .route("/", get(handler::index_handler))
        .route("/health", get(handler::health_handler))
        .route("/configure", get(handler::configure_handler))
        .route("/create", put(handler::create_handler))
        .route("/put", put(handler::put_handler))
        .route("/data", get(handler::data_handler))
        .route("/latest", get(handler::latest_handler))
        .route("/topics", get(handler::topics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}
