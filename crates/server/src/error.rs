use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use faceclass_core::classification::domain::classification_result::ClassificationResult;

/// Upload endpoint failures, answered as `{"error": ...}`.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No file part in the request")]
    MissingFilePart,
    #[error("No file selected for upload")]
    EmptyFilename,
    #[error("Invalid file name: {0}")]
    InvalidFilename(String),
    #[error("Malformed multipart body: {0}")]
    Multipart(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Error saving file: {self}");
        } else {
            log::warn!("Rejected upload: {self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Classification responses are always arrays; errors are one-entry arrays.
pub fn classification_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(vec![ClassificationResult::error(message)])).into_response()
}
