//! Error types for visage-api
//!
//! Every failure leaving a handler or middleware is an [`ApiError`], which
//! renders as a status code plus the `{error, message, code}` JSON body.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};
use visage_common::api::{AuthError, ErrorCategory, ErrorResponse};

use crate::db::analyses::StoreError;
use crate::services::analysis_pipeline::PipelineError;
use crate::services::oracle_client::OracleError;
use crate::services::upload_validator::UploadError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Path identifier that cannot name any record
    #[error("Analysis not found: {0}")]
    NotFound(String),

    /// Too many requests from one client (429)
    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Upload(e) => ApiError::Upload(e),
            PipelineError::Oracle(e) => ApiError::Oracle(e),
            PipelineError::Store(e) => ApiError::Store(e),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upload(UploadError::UnsupportedType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ApiError::Upload(_) => StatusCode::BAD_REQUEST,
            ApiError::Oracle(OracleError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Oracle(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(StoreError::NotFound(_)) | ApiError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::Auth(_) => ErrorCategory::AuthenticationError,
            ApiError::Upload(_) => ErrorCategory::ValidationError,
            ApiError::Oracle(_) => ErrorCategory::OracleError,
            ApiError::Store(StoreError::NotFound(_)) | ApiError::NotFound(_) => {
                ErrorCategory::NotFoundError
            }
            ApiError::Store(_) => ErrorCategory::StorageError,
            ApiError::RateLimited { .. } => ErrorCategory::RateLimitError,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Auth(e) => e.code(),
            ApiError::Upload(e) => e.code(),
            ApiError::Oracle(e) => e.code(),
            ApiError::Store(e) => e.code(),
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
        }
    }

    /// Human-readable message; storage internals stay in the log
    fn message(&self) -> String {
        match self {
            ApiError::Store(StoreError::Unavailable(_)) => {
                "Storage is temporarily unavailable".to_string()
            }
            ApiError::Store(StoreError::Corrupt(_)) => {
                "A stored record could not be read".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse::new(self.category(), self.code(), self.message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), status = status.as_u16(), "{}", self);
        } else if !matches!(self, ApiError::Auth(_)) {
            // auth rejections are already logged by the gate
            warn!(code = self.code(), status = status.as_u16(), "{}", self);
        }

        let mut response = (status, Json(self.to_body())).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
