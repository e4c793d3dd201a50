//! Analysis identifier utilities

use uuid::Uuid;

/// Generate a new analysis identifier (UUIDv4)
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse an identifier taken from a request path
///
/// Returns `None` for anything that is not a UUID; callers treat that the
/// same as an unknown identifier.
pub fn parse(s: &str) -> Option<Uuid> {
    Uuid::parse_str(s.trim()).ok()
}
