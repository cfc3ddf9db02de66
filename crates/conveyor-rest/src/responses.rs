//! Response envelopes and the error-to-status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use conveyor_core::{ConveyorError, Job, JobStatus, PageMetadata};
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// `{"job": …}` envelope.
#[derive(Debug, Serialize)]
pub struct JobEnvelope {
    pub job: Job,
}

/// `{"status": …}` envelope.
#[derive(Debug, Serialize)]
pub struct StatusEnvelope {
    pub status: JobStatus,
}

/// `{"jobs": […], "metadata": …}` envelope.
#[derive(Debug, Serialize)]
pub struct JobListEnvelope {
    pub jobs: Vec<Job>,
    pub metadata: PageMetadata,
}

const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// Wraps a [`ConveyorError`] so handlers can bubble it with `?`.
///
/// The body is always an `{"error": …}` envelope: a field map for
/// validation failures, the error message for other client errors, and a
/// generic message (with the detail logged) for server errors.
#[derive(Debug)]
pub struct ApiError(pub ConveyorError);

impl From<ConveyorError> for ApiError {
    fn from(err: ConveyorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match &self.0 {
            ConveyorError::Validation(fields) => json!({ "error": fields }),
            err if status.is_server_error() => {
                error!(error = %err, code = err.error_code(), "request failed");
                json!({ "error": SERVER_ERROR_MESSAGE })
            }
            err => json!({ "error": err.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// 400 with the decoder's message, for unreadable request bodies.
pub fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
        .into_response()
}

/// 404 envelope used by the router fallback.
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "the requested resource could not be found" })),
    )
        .into_response()
}

/// 405 envelope used when the path exists but not for this method.
pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "the method is not supported for this resource" })),
    )
        .into_response()
}
