//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become an HTTP status with a
//! short plain-text reason.
//!
//! **Security note:** storage, template and other internal errors are logged
//! with full detail but the client only sees "internal server error", so file
//! paths and SQL never leak.

use anonchat_core::ChatError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// All errors that can occur in the anonchat-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the chat room (validation or storage).
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// The request body could not be parsed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeded the configured limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Page rendering failed.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl ServerError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ServerError::Chat(e) => match e {
                ChatError::InvalidRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
                ChatError::UnsupportedType(m) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, m.clone()),
                ChatError::PayloadTooLarge { limit } => (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("File too large (limit {limit} bytes)"),
                ),
                ChatError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found".to_owned()),
                ChatError::Storage(inner) => {
                    error!(error = %inner, "storage failure");
                    internal()
                }
                ChatError::Config(m) => {
                    error!(message = %m, "configuration error surfaced in a request");
                    internal()
                }
            },
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m.clone()),
            ServerError::Template(e) => {
                error!(error = %e, "template rendering failed");
                internal()
            }
        }
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_owned(),
    )
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        self.status_and_message().into_response()
    }
}
