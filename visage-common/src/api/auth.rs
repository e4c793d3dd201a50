//! Access control gate: credential extraction and validation
//!
//! A credential may be presented in two equivalent forms:
//! - `X-API-Key: <credential>`
//! - `Authorization: Bearer <credential>`
//!
//! Presentations are tried in that fixed order and the first one found in the
//! configured set wins. No presentation at all is `MissingCredential`; one or
//! more presentations with none valid is `InvalidCredential`.
//!
//! The configured set only keeps SHA-256 digests of the credentials, so a
//! heap dump or `Debug` output never contains them.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Custom header carrying a raw credential
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authentication failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Neither presentation form was supplied
    #[error("Authentication required: provide a credential via the X-API-Key header or an Authorization: Bearer token")]
    MissingCredential,

    /// A credential was supplied but is not in the configured set
    #[error("The provided credential is not valid")]
    InvalidCredential,
}

impl AuthError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "MISSING_CREDENTIAL",
            AuthError::InvalidCredential => "INVALID_CREDENTIAL",
        }
    }
}

/// Where an accepted credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    ApiKeyHeader,
    BearerToken,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::ApiKeyHeader => "x-api-key",
            CredentialSource::BearerToken => "bearer",
        }
    }
}

/// Immutable set of valid credentials, populated at process start
#[derive(Clone, Default)]
pub struct CredentialSet {
    digests: HashSet<[u8; 32]>,
}

impl CredentialSet {
    /// Build the set; surrounding whitespace is ignored and blank entries are dropped
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let digests = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .map(|k| digest(&k))
            .collect();
        Self { digests }
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Check a presented credential against the set
    pub fn contains(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        !candidate.is_empty() && self.digests.contains(&digest(candidate))
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialSet({} credentials)", self.digests.len())
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Extract the token from an `Authorization` header value
///
/// Only the `Bearer` scheme (case-insensitive) is recognized.
///
/// # Examples
///
/// ```
/// use visage_common::api::auth::bearer_token;
///
/// assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
/// assert_eq!(bearer_token("bearer   abc123 "), Some("abc123"));
/// assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
/// assert_eq!(bearer_token("Bearer "), None);
/// ```
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Collect the presented credentials in evaluation order
pub fn presented_credentials<'a>(
    api_key_header: Option<&'a str>,
    authorization: Option<&'a str>,
) -> Vec<(CredentialSource, &'a str)> {
    let mut presented = Vec::with_capacity(2);

    if let Some(key) = api_key_header.map(str::trim).filter(|k| !k.is_empty()) {
        presented.push((CredentialSource::ApiKeyHeader, key));
    }
    if let Some(token) = authorization.and_then(bearer_token) {
        presented.push((CredentialSource::BearerToken, token));
    }

    presented
}

/// Run the access control gate over raw header values
pub fn authenticate(
    credentials: &CredentialSet,
    api_key_header: Option<&str>,
    authorization: Option<&str>,
) -> Result<CredentialSource, AuthError> {
    let presented = presented_credentials(api_key_header, authorization);
    if presented.is_empty() {
        return Err(AuthError::MissingCredential);
    }

    presented
        .into_iter()
        .find(|(_, value)| credentials.contains(value))
        .map(|(source, _)| source)
        .ok_or(AuthError::InvalidCredential)
}

/// Mask a credential for logging (first four characters only)
pub fn mask_credential(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    format!("{}...", prefix)
}
