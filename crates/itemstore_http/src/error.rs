//! Error translation from core results to HTTP responses.
//!
//! # Invariants
//! - `NotFound -> 404`, `Conflict -> 409`, `Immutable`/validation -> `400`,
//!   `Cancelled -> 503`, anything else -> `500`.
//! - Response bodies are always `HttpError` JSON.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use itemstore_core::{ErrorKind, PatchError, ServiceError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// JSON error body returned by every failing route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Handler failure carrying its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: HttpError,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: HttpError {
                message: message.into(),
                error: None,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn with_cause(mut self, cause: impl ToString) -> Self {
        self.body.error = Some(cause.to_string());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Maps a core error category to its response status.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Immutable | ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        let status = status_for(value.kind());
        if status.is_server_error() {
            Self::new(status, "error on accessing the item repository").with_cause(value)
        } else {
            Self::new(status, value.to_string())
        }
    }
}

impl From<PatchError> for ApiError {
    fn from(value: PatchError) -> Self {
        ServiceError::from(value).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(
                "event=http_error module=http status={} message={}",
                self.status.as_u16(),
                self.body.message
            );
        } else {
            debug!("event=http_error module=http status={}", self.status.as_u16());
        }
        (self.status, Json(self.body)).into_response()
    }
}
