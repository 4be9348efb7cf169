//! HTTP error responses.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use pitsa_core::storage::StorageError;
use pitsa_shared::{AppError, JwtError};

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Stable error code.
    pub error: String,
    /// Human readable message.
    pub message: String,
}

/// Error returned by handlers; renders as [`ErrorBody`].
#[derive(Debug)]
pub struct ApiError(pub AppError);

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::Stream(source) => match source.downcast_ref::<MultipartError>() {
                Some(e) => return Self::from_multipart(e),
                None => AppError::Validation(format!("upload stream failed: {source}")),
            },
            StorageError::InvalidPath(path) => {
                AppError::Validation(format!("invalid storage path: {path}"))
            }
            other => AppError::Internal(other.to_string()),
        };
        Self(app)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::from_multipart(&err)
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self(AppError::Database(err.to_string()))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        Self(AppError::Internal(err.to_string()))
    }
}

impl ApiError {
    fn from_multipart(err: &MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self(AppError::PayloadTooLarge(err.body_text()))
        } else {
            Self(AppError::Validation(err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if self.0.is_internal() {
            error!(error = %self.0, "Request failed");
            "An internal error occurred".to_string()
        } else {
            self.0.message().to_string()
        };

        let body = ErrorBody {
            error: self.0.error_code().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
