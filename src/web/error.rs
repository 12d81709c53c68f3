//! Conversion of application failures into HTTP responses.

use crate::{errors::Error, images::ImageHostError};
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

/// Error returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Validation, lookup or persistence failure
    #[error(transparent)]
    App(#[from] Error),

    /// Direct upload through `/upload` failed
    #[error(transparent)]
    Upload(#[from] ImageHostError),

    /// The multipart body could not be read
    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    /// Required request part missing
    #[error("{message}")]
    BadRequest {
        /// Human readable description
        message: String,
        /// Machine-readable code
        code: &'static str,
    },

    /// Diagnostics requested for a provider that does not exist
    #[error("Unknown image provider '{0}'")]
    UnknownProvider(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::App(e) if e.is_validation() => {
                (StatusCode::BAD_REQUEST, json!({ "error": e.to_string() }))
            }
            Self::App(e @ Error::ProductNotFound { .. }) => {
                (StatusCode::NOT_FOUND, json!({ "error": e.to_string() }))
            }
            Self::App(e) => {
                error!("Request failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            Self::Upload(e) => {
                let status = if e.is_client_error() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (status, json!({ "error": e.to_string(), "code": e.code() }))
            }
            Self::Multipart(e) => {
                warn!("Rejected multipart body: {e}");
                (
                    e.status(),
                    json!({ "error": e.body_text(), "code": "invalid_multipart" }),
                )
            }
            Self::BadRequest { message, code } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "code": code }),
            ),
            Self::UnknownProvider(_) => (StatusCode::NOT_FOUND, json!({ "error": self.to_string() })),
        };

        (status, Json(body)).into_response()
    }
}
