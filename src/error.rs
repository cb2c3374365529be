use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::types::activity::FileFormat;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Unsupported file format. Please upload a FIT, TCX, or GPX file.")]
    UnsupportedFormat,
    #[error("Invalid {format}: {reason}")]
    Decode { format: FileFormat, reason: String },
    #[error("No activity data found in {0} file")]
    EmptyActivity(FileFormat),
}

impl ParseError {
    pub fn decode(format: FileFormat, reason: impl Into<String>) -> Self {
        ParseError::Decode {
            format,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Parse(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
