//! Error responses.
//!
//! Every failure leaves the server as `{"error": "...", "details": "..."}`
//! with `details` omitted when there is nothing to add.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{error::SampleError, pipeline::PipelineError};

/// An error that renders as a JSON response.
#[derive(Debug)]
pub struct AppError {
    /// Response status.
    pub status: StatusCode,
    /// Short message for the `error` field.
    pub error: String,
    /// Underlying cause for the `details` field.
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl AppError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.error, details = ?self.details, "Request failed");
        } else {
            tracing::warn!(status = %self.status, error = %self.error, "Request rejected");
        }

        let body = ErrorBody {
            error: &self.error,
            details: self.details.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<MultipartError> for AppError {
    fn from(error: MultipartError) -> Self {
        AppError::new(error.status(), "Invalid upload").with_details(error.body_text())
    }
}

impl From<PipelineError> for AppError {
    fn from(error: PipelineError) -> Self {
        let details = error.to_string();
        let (status, message) = match &error {
            PipelineError::Sample(
                SampleError::UnreadableSource { .. }
                | SampleError::InvalidMedia { .. }
                | SampleError::InvalidFrameCount,
            ) => (StatusCode::UNPROCESSABLE_ENTITY, "Could not read video"),
            PipelineError::Sample(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Frame extraction failed"),
            PipelineError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "Frame extraction timed out"),
            PipelineError::Analysis(_) => (StatusCode::BAD_GATEWAY, "Frame analysis failed"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to process video"),
        };
        AppError::new(status, message).with_details(details)
    }
}
