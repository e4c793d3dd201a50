//! Shared HTTP API functionality
//!
//! Contains ONLY pure functions and shared types: credential checking for
//! the access control gate and the structured error body. The service crate
//! wraps these with axum middleware and `IntoResponse` impls.

pub mod auth;
pub mod types;

pub use auth::{authenticate, AuthError, CredentialSet, CredentialSource, API_KEY_HEADER};
pub use types::{ErrorCategory, ErrorResponse, HealthResponse};
