//! Access control middleware
//!
//! Thin axum wrapper over [`visage_common::api::auth::authenticate`]. Runs
//! before the handler, so a rejected request never has its body read.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use visage_common::api::auth::{authenticate, mask_credential, AuthError, API_KEY_HEADER};

use crate::error::ApiError;
use crate::AppState;

/// Reject requests without a valid credential
pub async fn require_credential(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers();
    let api_key = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    // Non-ASCII header bytes are still a presented credential
    let unreadable = [API_KEY_HEADER, header::AUTHORIZATION.as_str()]
        .into_iter()
        .any(|name| headers.get(name).is_some_and(|v| v.to_str().is_err()));

    let outcome = match authenticate(&state.credentials, api_key, authorization) {
        Err(AuthError::MissingCredential) if unreadable => Err(AuthError::InvalidCredential),
        other => other,
    };

    match outcome {
        Ok(source) => {
            debug!(credential_source = source.as_str(), "Request authenticated");
            Ok(next.run(request).await)
        }
        Err(err) => {
            warn!(
                code = err.code(),
                path = %request.uri().path(),
                presented = %api_key.map(mask_credential).unwrap_or_else(|| "-".to_string()),
                "Rejected unauthenticated request"
            );
            Err(err.into())
        }
    }
}
