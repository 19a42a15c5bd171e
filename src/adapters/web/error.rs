//! JSON error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::WatchError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

pub fn status_from_error(err: &WatchError) -> StatusCode {
    match err {
        WatchError::SubscriptionNotFound { .. } => StatusCode::NOT_FOUND,
        WatchError::InvalidSubscription { .. }
        | WatchError::ConfigMissing { .. }
        | WatchError::ConfigInvalid { .. }
        | WatchError::ConfigParse { .. } => StatusCode::BAD_REQUEST,
        WatchError::InsufficientData { .. } | WatchError::DegenerateFit => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WatchError::Fetch { .. } | WatchError::UpstreamApi { .. } | WatchError::Timeout { .. } => {
            StatusCode::BAD_GATEWAY
        }
        WatchError::Persistence { .. } | WatchError::Dispatch { .. } | WatchError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<WatchError> for WebError {
    fn from(err: WatchError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), error = %self.message, "request failed");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
