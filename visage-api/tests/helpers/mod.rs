//! Test Helper Utilities
//!
//! Shared utilities for testing visage-api

#![allow(dead_code)]

pub mod mock_oracle;
pub mod requests;

pub use mock_oracle::MockOracle;
pub use requests::{
    body_json, encoded_image, get, jpeg_bytes, png_bytes, upload, upload_request, webp_bytes,
    TEST_API_KEY,
};

use axum::Router;
use std::sync::Arc;
use visage_api::db::AnalysisStore;
use visage_api::{build_router, AppState};
use visage_common::config::TomlConfig;
use visage_common::db::init_memory_database;

/// Configuration used by most tests: one credential, no rate limiting
pub fn test_config() -> TomlConfig {
    let mut config = TomlConfig::default();
    config.auth.api_keys = vec![TEST_API_KEY.to_string()];
    config.rate_limit.requests_per_minute = 0;
    config.oracle.timeout_secs = 5;
    config
}

/// Build a router over an in-memory database and the given oracle
pub async fn test_app_with(oracle: Arc<MockOracle>, config: &TomlConfig) -> (Router, AnalysisStore) {
    let pool = init_memory_database().await.unwrap();
    let store = AnalysisStore::new(pool);
    (test_app_over(oracle, store.clone(), config), store)
}

/// Build a router over an existing store
pub fn test_app_over(oracle: Arc<MockOracle>, store: AnalysisStore, config: &TomlConfig) -> Router {
    build_router(AppState::new(store, oracle, config))
}

/// Router with default test config
pub async fn test_app(oracle: Arc<MockOracle>) -> (Router, AnalysisStore) {
    test_app_with(oracle, &test_config()).await
}
