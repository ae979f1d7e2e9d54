//! API error types and JSON error response formatting.
//!
//! ApiError gives every endpoint the same JSON error body and maps dialogue
//! failures to HTTP status codes. Failures are never disguised as replies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use helpline_dialogue::{ClassifierError, DialogueError};

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "configuration_error").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid fields.
    BadRequest(String),
    /// 404 Not Found - unknown user.
    NotFound(String),
    /// 500 - the classifier emitted a category the catalog does not cover.
    Configuration(String),
    /// 500 - the turn was recorded but could not be written to disk.
    Persistence(String),
    /// 500 Internal Server Error - unexpected server error.
    Internal(String),
    /// 503 - the classifier could not produce a prediction.
    ClassifierUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                msg,
            ),
            ApiError::Persistence(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            ApiError::ClassifierUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "classifier_unavailable",
                msg,
            ),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DialogueError> for ApiError {
    fn from(err: DialogueError) -> Self {
        match &err {
            DialogueError::UnknownCategory(_) | DialogueError::InvalidThreshold(_) => {
                ApiError::Configuration(err.to_string())
            }
            DialogueError::Persistence(_) => ApiError::Persistence(err.to_string()),
            DialogueError::Classifier(ClassifierError::InvalidInput(msg)) => {
                ApiError::BadRequest(msg.clone())
            }
            DialogueError::Classifier(ClassifierError::InvalidConfidence { .. }) => {
                ApiError::Internal(err.to_string())
            }
            DialogueError::Classifier(_) => ApiError::ClassifierUnavailable(err.to_string()),
        }
    }
}
