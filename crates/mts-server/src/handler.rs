use std::io::{self, Read};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use mts_store::{StoreResult, TopicReader, TopicStore};

use crate::error::{ServerError, ServerResult};

/// Shared state handed to every handler.
pub type AppState = Arc<TopicStore>;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Metrics Topic Store</title></head>
<body>
<h1>Metrics Topic Store</h1>
<ul>
<li><code>GET /configure?datapath=PATH</code> set the storage directory</li>
<li><code>PUT /create?topic=NAME</code> create a topic</li>
<li><code>PUT /put?topic=NAME&amp;data=JSON</code> append a record</li>
<li><code>GET /data?topic=NAME</code> all records, one per line</li>
<li><code>GET /latest?topic=NAME</code> the newest record</li>
<li><code>GET /topics</code> list topics</li>
</ul>
</body>
</html>
"#;

/// Bytes read from a topic log per body chunk.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the reading thread and the response body.
const STREAM_CHANNEL_DEPTH: usize = 4;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigureQuery {
    pub datapath: Option<String>,
}

/// `topic` is the canonical parameter; `name` is accepted on `/create`.
#[derive(Debug, Default, Deserialize)]
pub struct TopicQuery {
    pub topic: Option<String>,
    pub name: Option<String>,
}

impl TopicQuery {
    fn topic(self) -> ServerResult<String> {
        self.topic
            .or(self.name)
            .ok_or(ServerError::MissingParameter("topic"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PutQuery {
    pub topic: Option<String>,
    pub data: Option<String>,
}

/// Run a store operation on the blocking pool.
async fn blocking<T, F>(store: &AppState, op: F) -> ServerResult<T>
where
    F: FnOnce(&TopicStore) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    let result = tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(result?)
}

/// Feed `reader` into `tx` chunk by chunk until EOF, a read error, or the
/// receiver going away.
fn pump_chunks(mut reader: TopicReader, tx: mpsc::Sender<io::Result<Vec<u8>>>) {
    loop {
        let mut chunk = vec![0u8; STREAM_CHUNK_SIZE];
        match reader.read(&mut chunk) {
            Ok(0) => return,
            Ok(n) => {
                chunk.truncate(n);
                if tx.blocking_send(Ok(chunk)).is_err() {
                    debug!("client went away while streaming topic");
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                return;
            }
        }
    }
}

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health_handler(State(store): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "mts-server",
        "version": env!("CARGO_PKG_VERSION"),
        "configured": store.root().is_some(),
    }))
}

pub async fn configure_handler(
    State(store): State<AppState>,
    Query(query): Query<ConfigureQuery>,
) -> ServerResult<String> {
    let path = query
        .datapath
        .ok_or(ServerError::MissingParameter("datapath"))?;
    let root = store.reconfigure(path)?;
    Ok(format!("SUCCESS: The datapath has been set to {root}"))
}

pub async fn create_handler(
    State(store): State<AppState>,
    Query(query): Query<TopicQuery>,
) -> ServerResult<impl IntoResponse> {
    let topic = query.topic()?;
    let name = topic.clone();
    blocking(&store, move |s| s.create_topic(&name)).await?;
    Ok((
        StatusCode::CREATED,
        format!("SUCCESS: Topic {topic} created successfully"),
    ))
}

pub async fn put_handler(
    State(store): State<AppState>,
    Query(query): Query<PutQuery>,
) -> ServerResult<String> {
    let topic = query.topic.ok_or(ServerError::MissingParameter("topic"))?;
    let data = query.data.ok_or(ServerError::MissingParameter("data"))?;
    let value: serde_json::Value =
        serde_json::from_str(&data).map_err(|e| ServerError::InvalidPayload(e.to_string()))?;

    blocking(&store, move |s| s.append_json(&topic, &value)).await?;
    Ok("SUCCESS: The data was successfully pushed to the topic!".to_string())
}

pub async fn data_handler(
    State(store): State<AppState>,
    Query(query): Query<TopicQuery>,
) -> ServerResult<impl IntoResponse> {
    let topic = query.topic()?;
    let reader = blocking(&store, move |s| s.read_all(&topic)).await?;

    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_DEPTH);
    tokio::task::spawn_blocking(move || pump_chunks(reader, tx));

    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(ReceiverStream::new(rx)),
    ))
}

pub async fn latest_handler(
    State(store): State<AppState>,
    Query(query): Query<TopicQuery>,
) -> ServerResult<impl IntoResponse> {
    let topic = query.topic()?;
    let record = blocking(&store, move |s| s.read_last(&topic)).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], record))
}

pub async fn topics_handler(State(store): State<AppState>) -> ServerResult<String> {
    let topics = blocking(&store, |s| s.list_topics()).await?;
    Ok(topics.join("\n"))
}
