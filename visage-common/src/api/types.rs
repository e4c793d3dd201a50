//! Shared API response types

use serde::{Deserialize, Serialize};

use super::auth::AuthError;

/// Error category reported in the `error` field of every failure body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    AuthenticationError,
    ValidationError,
    OracleError,
    NotFoundError,
    StorageError,
    RateLimitError,
}

/// Structured error body: `{ "error", "message", "code" }`
///
/// # Examples
///
/// ```
/// use visage_common::api::types::{ErrorCategory, ErrorResponse};
///
/// let body = ErrorResponse::new(ErrorCategory::NotFoundError, "NOT_FOUND", "Analysis not found");
/// let json = serde_json::to_value(&body).unwrap();
/// assert_eq!(json["error"], "not_found_error");
/// assert_eq!(json["code"], "NOT_FOUND");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorCategory,
    pub message: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(category: ErrorCategory, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: category,
            message: message.into(),
            code: code.into(),
        }
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        Self::new(ErrorCategory::AuthenticationError, err.code(), err.to_string())
    }
}

/// Liveness probe response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok" when the process can answer
    pub status: String,
    pub message: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_body() {
        let body = ErrorResponse::from(AuthError::MissingCredential);
        assert_eq!(body.error, ErrorCategory::AuthenticationError);
        assert_eq!(body.code, "MISSING_CREDENTIAL");
        assert!(body.message.contains("X-API-Key"));
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&ErrorCategory::RateLimitError).unwrap();
        assert_eq!(json, "\"rate_limit_error\"");
    }
}
