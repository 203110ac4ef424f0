// ============================================================
// API Layer - Errors
// ============================================================
// Every failure leaves the server as `{"error": "<message>"}`
// with a status code that tells the client whose fault it was.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No file provided")]
    NoFile,

    #[error("No file selected")]
    EmptyFileName,

    #[error("Invalid file type. Allowed types: {allowed}")]
    UnsupportedType { allowed: String },

    #[error("File too large. Maximum size is {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Malformed upload: {0}")]
    BadUpload(String),

    #[error("{0}")]
    InvalidImage(String),

    #[error("Model not loaded. Train a model first.")]
    ModelNotLoaded,

    #[error("Prediction failed: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoFile
            | ApiError::EmptyFileName
            | ApiError::UnsupportedType { .. }
            | ApiError::BadUpload(_)
            | ApiError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        } else {
            tracing::debug!("Rejected request: {self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
