//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured
//! error variants mapped onto the ingestion error taxonomy: validation
//! failures surface as 4xx and are never retried, infrastructure
//! failures surface as 5xx, and persistence conflicts abort the
//! enclosing transaction.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::db::StoreError;
use crate::metadata_client::MetadataClientError;
use crate::storage::StorageError;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upload is not a decodable image of a supported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Upload exceeds the configured size limit
    #[error("File too large: {0}")]
    FileTooLarge(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Infrastructure error - object store or downstream RPC unreachable
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    /// Persistence error - constraint violation or failed transaction
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            Self::FileTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Infrastructure(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::FileTooLarge(_) => "FILE_TOO_LARGE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Infrastructure(_) => "INFRASTRUCTURE_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::FileTooLarge(_) => "file_too_large",
            Self::NotFound(_) => "not_found",
            Self::Infrastructure(_) => "infrastructure",
            Self::Persistence(_) => "persistence",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<moments_core::MomentsError> for ApiError {
    fn from(err: moments_core::MomentsError) -> Self {
        match err {
            moments_core::MomentsError::UnsupportedFormat(msg)
            | moments_core::MomentsError::Decode(msg) => Self::UnsupportedFormat(msg),
            moments_core::MomentsError::Encode(msg) => Self::Internal(msg),
            moments_core::MomentsError::Io(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        // Store errors can leave metadata referencing a missing object,
        // so they are never silently swallowed.
        Self::Infrastructure(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Conflict(msg) => Self::Persistence(msg),
            StoreError::Connection(msg) | StoreError::Query(msg) => Self::Persistence(msg),
        }
    }
}

impl From<MetadataClientError> for ApiError {
    fn from(err: MetadataClientError) -> Self {
        match err {
            MetadataClientError::NotFound(what) => Self::NotFound(what),
            MetadataClientError::Store(e) => Self::from(e),
            MetadataClientError::Transport(msg) | MetadataClientError::Rejected { message: msg, .. } => {
                Self::Infrastructure(msg)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let message = self.to_string();

        // Log based on severity
        match &self {
            Self::BadRequest(_) | Self::UnsupportedFormat(_) | Self::FileTooLarge(_)
            | Self::NotFound(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %message,
                    "Client error"
                );
            }
            Self::Infrastructure(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %message,
                    "Downstream unavailable"
                );
            }
            Self::Persistence(_) | Self::Internal(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %message,
                    "Server error"
                );
            }
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_is_client_visible_4xx() {
        let err = ApiError::from(moments_core::MomentsError::UnsupportedFormat("Bmp".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn test_storage_errors_are_5xx() {
        let err = ApiError::from(StorageError::Backend("bucket unreachable".into()));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_store_not_found_maps_to_404() {
        let err = ApiError::from(StoreError::NotFound("photo".into()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_conflict_maps_to_persistence_error() {
        let err = ApiError::from(StoreError::Conflict("duplicate key".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "PERSISTENCE_ERROR");
    }
}
