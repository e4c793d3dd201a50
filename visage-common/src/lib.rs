//! # Visage Common Library
//!
//! Shared code for the Visage facial analysis service:
//! - Bootstrap configuration loading
//! - Credential checking for the access control gate
//! - Structured error response types
//! - SQLite pool creation and schema
//! - Timestamp and identifier helpers
//!
//! Everything here is free of HTTP framework dependencies; the service crate
//! wraps it with axum-specific extractors and middleware.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod time;

pub use error::{Error, Result};
