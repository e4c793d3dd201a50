//! Liveness probe and service root
//!
//! Neither route touches storage or the oracle, so both answer as long as the
//! process can serve HTTP.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use visage_common::api::HealthResponse;

use crate::AppState;

pub const HEALTH_PATH: &str = "/api/health";

/// Service root response
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub service: String,
    pub version: String,
    pub health: String,
}

/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);

    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Visage API is running".to_string(),
        module: "visage-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
    })
}

/// GET /
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        service: "visage-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        health: HEALTH_PATH.to_string(),
    })
}

/// Build public routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route(HEALTH_PATH, get(health_check))
}
