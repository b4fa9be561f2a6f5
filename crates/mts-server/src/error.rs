use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use mts_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("missing query parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("payload is not valid JSON: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) | Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::Store(err) => match err {
                StoreError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                StoreError::InvalidPath { .. }
                | StoreError::InvalidTopicName { .. }
                | StoreError::InvalidRecord(_) => StatusCode::BAD_REQUEST,
                StoreError::AlreadyExists { .. } => StatusCode::CONFLICT,
                StoreError::TopicNotFound { .. } | StoreError::EmptyTopic { .. } => {
                    StatusCode::NOT_FOUND
                }
                StoreError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
                StoreError::Serialization(_) | StoreError::Io(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, format!("ERROR: {self}")).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
