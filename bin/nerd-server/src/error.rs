//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are converted to a
//! `{"error": "..."}` JSON body with an appropriate status code.
//!
//! Backend failures carry a remediation hint for the operator; internal
//! errors are logged in full and reach the caller only as a generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nerd_core::RelayError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// All errors that can occur in the nerd-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The model runtime failed; `endpoint` is where it was expected.
    #[error("backend error: {message}")]
    Backend { message: String, endpoint: String },

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Attach the provider endpoint to a relay error so backend failures can
    /// tell the operator where the runtime was expected.
    pub fn from_relay(e: RelayError, endpoint: impl Into<String>) -> Self {
        match e {
            RelayError::BackendFailure { message } => ServerError::Backend {
                message,
                endpoint: endpoint.into(),
            },
            other => other.into(),
        }
    }
}

impl From<RelayError> for ServerError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::InvalidInput(m) => ServerError::BadRequest(m),
            RelayError::NotFound(_) => ServerError::NotFound("Image not found".into()),
            RelayError::BackendFailure { message } => ServerError::Backend {
                message,
                endpoint: "the configured host".into(),
            },
            e @ RelayError::ResolutionFailure { .. } => ServerError::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),

            ServerError::Backend { message, endpoint } => {
                error!(error = %message, %endpoint, "model backend error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Ollama error: {message}\nMake sure Ollama is running at {endpoint}."),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}
