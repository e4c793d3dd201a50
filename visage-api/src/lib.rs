//! visage-api library interface
//!
//! Exposes the router and application state so integration tests can drive
//! the service in-process.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware, Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use visage_common::api::CredentialSet;
use visage_common::config::TomlConfig;

use crate::api::rate_limit::{self, ClientRateLimiter};
use crate::db::AnalysisStore;
use crate::services::{AnalysisPipeline, ScoringOracle, UploadLimits};

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers
///
/// Built once at startup and never mutated; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Analysis record store
    pub store: AnalysisStore,
    /// Write path (validator, oracle, store)
    pub pipeline: Arc<AnalysisPipeline>,
    /// Valid credentials for the access control gate
    pub credentials: Arc<CredentialSet>,
    /// Per-client limiter; `None` when limiting is disabled
    pub rate_limiter: Option<Arc<ClientRateLimiter>>,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Assemble state from configuration and an oracle implementation
    pub fn new(store: AnalysisStore, oracle: Arc<dyn ScoringOracle>, config: &TomlConfig) -> Self {
        let limits = UploadLimits::from_config(&config.upload);
        let pipeline = AnalysisPipeline::new(oracle, store.clone(), limits, config.oracle.timeout());

        Self {
            store,
            pipeline: Arc::new(pipeline),
            credentials: Arc::new(CredentialSet::new(&config.auth.api_keys)),
            rate_limiter: rate_limit::build_limiter(config.rate_limit.requests_per_minute),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .pipeline
        .limits()
        .max_file_size()
        .saturating_add(MULTIPART_OVERHEAD);

    // route_layer: last added runs first, so the rate limit sees every
    // attempt, including ones that would fail authentication
    let protected = Router::new()
        .merge(api::analysis_routes())
        .merge(api::stats_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::require_credential,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit_per_client,
        ));

    Router::new()
        .merge(api::health_routes())
        .merge(protected)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .with_state(state)
}
