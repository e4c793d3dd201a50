//! HTTP API for visage-api
//!
//! Public: `/` and `/api/health`. Everything else sits behind the access
//! control gate and the per-client rate limiter.

pub mod analysis;
pub mod auth;
pub mod health;
pub mod rate_limit;
pub mod stats;

pub use analysis::analysis_routes;
pub use health::health_routes;
pub use stats::stats_routes;
