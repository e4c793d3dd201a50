//! Statistics endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::error::ApiResult;
use crate::models::Statistics;
use crate::services::statistics;
use crate::AppState;

/// GET /api/stats
pub async fn get_statistics(State(state): State<AppState>) -> ApiResult<Json<Statistics>> {
    let stats = statistics::compute_for(&state.store).await?;
    Ok(Json(stats))
}

/// Build statistics routes
pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats", get(get_statistics))
        .route("/api/stats/", get(get_statistics))
}
