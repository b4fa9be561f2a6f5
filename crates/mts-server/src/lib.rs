//! HTTP server for the Metrics Topic Store.
//!
//! Maps query-string requests onto [`mts_store::TopicStore`] operations and
//! renders plain-text responses. Store errors become HTTP statuses via
//! [`ServerError::status`].

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{ServerConfig, DATA_PATH_ENV};
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::MetricsServer;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use tower::util::ServiceExt;

    use mts_store::TopicStore;

    use super::*;

    async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, String) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn configured_app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let store = TopicStore::open(dir.path()).unwrap();
        (dir, build_router(Arc::new(store)))
    }

    #[tokio::test]
    async fn index_page() {
        let app = build_router(Arc::new(TopicStore::unconfigured()));
        let (status, body) = send(&app, "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Metrics Topic Store"));
    }

    #[tokio::test]
    async fn health_reports_configuration() {
        let app = build_router(Arc::new(TopicStore::unconfigured()));
        let (status, body) = send(&app, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["configured"], false);
    }

    #[tokio::test]
    async fn cpu_scenario_over_http() {
        let (_dir, app) = configured_app();

        let (status, _) = send(&app, "PUT", "/create?topic=cpu").await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(&app, "PUT", "/put?topic=cpu&data=%7B%22v%22%3A1%7D").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "PUT", "/put?topic=cpu&data=%7B%22v%22%3A2%7D").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "GET", "/latest?topic=cpu").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"v":2}"#);

        let (status, body) = send(&app, "GET", "/data?topic=cpu").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "{\"v\":1}\n{\"v\":2}\n");

        let (status, body) = send(&app, "GET", "/topics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "cpu");
    }

    #[tokio::test]
    async fn data_streams_topics_larger_than_one_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(TopicStore::open(dir.path()).unwrap());
        store.create_topic("bulk").unwrap();

        let mut expected = String::new();
        for i in 0..8_000 {
            let record = format!(r#"{{"seq":{i},"pad":"{:0>24}"}}"#, i);
            store.append("bulk", record.as_bytes()).unwrap();
            expected.push_str(&record);
            expected.push('\n');
        }
        assert!(expected.len() > 4 * 64 * 1024);

        let app = build_router(Arc::clone(&store));
        let (status, body) = send(&app, "GET", "/data?topic=bulk").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.len(), expected.len());
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn create_accepts_name_alias() {
        let (_dir, app) = configured_app();
        let (status, _) = send(&app, "PUT", "/create?name=mem").await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, body) = send(&app, "GET", "/topics").await;
        assert_eq!(body, "mem");
    }

    #[tokio::test]
    async fn unconfigured_store_is_unavailable() {
        let app = build_router(Arc::new(TopicStore::unconfigured()));
        let (status, body) = send(&app, "PUT", "/create?topic=cpu").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.starts_with("ERROR:"));

        let (status, _) = send(&app, "GET", "/topics").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn configure_enables_store() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(Arc::new(TopicStore::unconfigured()));

        let uri = format!("/configure?datapath={}", dir.path().display());
        let (status, body) = send(&app, "GET", &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("SUCCESS"));

        let (status, _) = send(&app, "PUT", "/create?topic=cpu").await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(dir.path().join("cpu.topic.metrics.data.txt").exists());
    }

    #[tokio::test]
    async fn missing_parameters_are_bad_requests() {
        let (_dir, app) = configured_app();
        for (method, uri) in [
            ("GET", "/configure"),
            ("PUT", "/create"),
            ("PUT", "/put?topic=cpu"),
            ("PUT", "/put?data=1"),
            ("GET", "/data"),
            ("GET", "/latest"),
        ] {
            let (status, _) = send(&app, method, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn invalid_json_is_rejected_not_stored() {
        let (_dir, app) = configured_app();
        send(&app, "PUT", "/create?topic=cpu").await;

        let (status, _) = send(&app, "PUT", "/put?topic=cpu&data=%7Bnot-json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "GET", "/latest?topic=cpu").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lifecycle_errors_map_to_statuses() {
        let (_dir, app) = configured_app();

        let (status, _) = send(&app, "PUT", "/put?topic=ghost&data=1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = send(&app, "GET", "/data?topic=ghost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.starts_with("ERROR:"));

        send(&app, "PUT", "/create?topic=cpu").await;
        let (status, _) = send(&app, "PUT", "/create?topic=cpu").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, "GET", "/latest?topic=cpu").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("no records"));

        let (status, _) = send(&app, "PUT", "/create?topic=a%2Fb").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
