//! Error type for the HTTP surface.

use attendance_client::AttendanceError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Validation(String),

    #[error("upstream error: {0}")]
    Upstream(AttendanceError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl From<AttendanceError> for ServerError {
    fn from(err: AttendanceError) -> Self {
        match err {
            AttendanceError::Validation(msg) => ServerError::Validation(msg),
            AttendanceError::Config(msg) => ServerError::Config(msg),
            other => ServerError::Upstream(other),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(%status, error = %self, "request failed");
        }
        let body = serde_json::json!({ "success": false, "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers.
pub type ServerResult<T> = Result<T, ServerError>;
