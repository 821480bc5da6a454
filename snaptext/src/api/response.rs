//! # Response contract
//!
//! Successful endpoints serialize their payload directly at the top level.
//! Failures share one shape:
//!
//! ```json
//! { "success": false, "error": "unsupported_file_type", "message": "Invalid file type. Allowed: ..." }
//! ```
//!
//! The HTTP status is derived from the [`ErrorCode`]. Internal details are
//! never sent to the client except for storage failures, whose message
//! carries the underlying cause.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::SnaptextError;

/// Machine-readable error code included in every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Missing field, empty filename or malformed multipart body. HTTP 400.
    InvalidRequest,
    /// Extension outside the allow-list. HTTP 400.
    UnsupportedFileType,
    /// The upload does not decode as an image. HTTP 400.
    InvalidImage,
    /// Request body over the configured ceiling. HTTP 413.
    PayloadTooLarge,
    /// The transient file could not be written. HTTP 500.
    StorageError,
    /// Anything unexpected. HTTP 500.
    InternalError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::UnsupportedFileType | Self::InvalidImage => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::StorageError | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::UnsupportedFileType => write!(f, "unsupported_file_type"),
            Self::InvalidImage => write!(f, "invalid_image"),
            Self::PayloadTooLarge => write!(f, "payload_too_large"),
            Self::StorageError => write!(f, "storage_error"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    /// Always `false`.
    pub success: bool,
    pub error: ErrorCode,
    pub message: String,
}

/// Either the endpoint's payload or an [`ApiError`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ApiResponse<T: Serialize> {
    Success(T),
    Failure(ApiError),
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::Success(data)
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Failure(ApiError {
            success: false,
            error: code,
            message: message.into(),
        })
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success(_) => StatusCode::OK,
            Self::Failure(err) => err.error.status(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status();
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                let body = serde_json::json!({
                    "success": false,
                    "error": "internal_error",
                    "message": "An internal error occurred"
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl<T: Serialize> From<SnaptextError> for ApiResponse<T> {
    /// Internal details are logged with `tracing::error!` and replaced by a
    /// generic message.
    fn from(err: SnaptextError) -> Self {
        match err {
            SnaptextError::Validation(msg) => ApiResponse::error(ErrorCode::InvalidRequest, msg),

            SnaptextError::UnsupportedFileType(msg) => {
                ApiResponse::error(ErrorCode::UnsupportedFileType, msg)
            }

            SnaptextError::InvalidImage(msg) => ApiResponse::error(
                ErrorCode::InvalidImage,
                format!("Uploaded file is not a valid image: {msg}"),
            ),

            SnaptextError::PayloadTooLarge(msg) => {
                ApiResponse::error(ErrorCode::PayloadTooLarge, msg)
            }

            SnaptextError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error mapped to response");
                ApiResponse::error(ErrorCode::StorageError, msg)
            }

            ref internal @ (SnaptextError::Processing(_)
            | SnaptextError::Io(_)
            | SnaptextError::Internal(_)
            | SnaptextError::Ocr(_)
            | SnaptextError::OcrUnavailable(_)
            | SnaptextError::OcrTimeout(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to response");
                ApiResponse::error(ErrorCode::InternalError, "An internal error occurred")
            }
        }
    }
}
