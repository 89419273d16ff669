//! Handler-boundary error type.
//!
//! Every failure leaves the server as `{"success": false, "error": "..."}`.
//! The underlying cause is logged, never returned to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::storage::StoreError;
use crate::vision::ModelError;

#[derive(Debug, Error)]
pub enum PlantError {
    #[error("No file provided")]
    MissingFile,

    #[error("Missing image URL")]
    MissingImageUrl,

    #[error("Failed to upload file")]
    Upload(#[source] StoreError),

    #[error("Failed to upload file")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Failed to upload file")]
    NotMultipart(#[from] axum::extract::multipart::MultipartRejection),

    #[error("Invalid response format from AI model")]
    InvalidModelResponse(#[source] serde_json::Error),

    #[error("Failed to identify plant. Please try again later.")]
    Identify(#[source] ModelError),
}

impl PlantError {
    pub fn status(&self) -> StatusCode {
        match self {
            PlantError::MissingFile | PlantError::MissingImageUrl => StatusCode::BAD_REQUEST,
            PlantError::Multipart(_) | PlantError::NotMultipart(_) => StatusCode::BAD_REQUEST,
            PlantError::Upload(_)
            | PlantError::InvalidModelResponse(_)
            | PlantError::Identify(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<StoreError> for PlantError {
    fn from(err: StoreError) -> Self {
        PlantError::Upload(err)
    }
}

impl From<ModelError> for PlantError {
    fn from(err: ModelError) -> Self {
        PlantError::Identify(err)
    }
}

impl IntoResponse for PlantError {
    fn into_response(self) -> Response {
        match std::error::Error::source(&self) {
            Some(cause) => tracing::error!(error = %self, cause = %cause, "request failed"),
            None => tracing::warn!(error = %self, "request rejected"),
        }

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}

pub type PlantResult<T> = Result<T, PlantError>;
