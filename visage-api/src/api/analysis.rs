//! Analysis endpoints: create, list, get, delete

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use visage_common::ids;

use crate::error::{ApiError, ApiResult};
use crate::models::{AnalysisRecord, AnalysisSummary};
use crate::services::analysis_pipeline::RawUpload;
use crate::services::upload_validator::{UploadError, UploadLimits};
use crate::AppState;

/// Multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// Delete confirmation
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub id: Uuid,
}

/// POST /api/analysis
pub async fn create_analysis(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<AnalysisRecord>> {
    let mut multipart =
        multipart.map_err(|rejection| UploadError::Malformed(rejection.body_text()))?;

    let upload = read_upload(&mut multipart, state.pipeline.limits()).await?;
    let record = state.pipeline.analyze(upload).await?;

    Ok(Json(record))
}

/// GET /api/analysis
pub async fn list_analyses(State(state): State<AppState>) -> ApiResult<Json<Vec<AnalysisSummary>>> {
    let summaries = state.store.list().await?;
    Ok(Json(summaries))
}

/// GET /api/analysis/:id
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AnalysisRecord>> {
    let id = parse_id(&id)?;
    let record = state.store.get(id).await?;
    Ok(Json(record))
}

/// DELETE /api/analysis/:id
pub async fn delete_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = parse_id(&id)?;
    state.store.delete(id).await?;

    info!(analysis_id = %id, "Analysis deleted");
    Ok(Json(DeleteResponse {
        message: "Analysis deleted successfully".to_string(),
        id,
    }))
}

/// A path segment that is not a UUID cannot name a record
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    ids::parse(raw).ok_or_else(|| ApiError::NotFound(raw.to_string()))
}

/// Stream the `file` field, enforcing the size limit chunk by chunk
///
/// Other fields are skipped. The declared content type is checked before
/// any of the file body is read.
async fn read_upload(
    multipart: &mut Multipart,
    limits: &UploadLimits,
) -> Result<RawUpload, UploadError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limits))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let filename = field.file_name().map(str::to_string);
        limits.check_declared_type(content_type.as_deref())?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limits))? {
            limits.check_size(bytes.len() + chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }

        return Ok(RawUpload {
            bytes,
            content_type,
            filename,
        });
    }

    Err(UploadError::MissingFile)
}

fn multipart_error(err: MultipartError, limits: &UploadLimits) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        // the transport body limit tripped before the per-chunk check did
        UploadError::TooLarge {
            size: limits.max_file_size().saturating_add(1),
            max: limits.max_file_size(),
        }
    } else {
        UploadError::Malformed(err.body_text())
    }
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analysis", get(list_analyses).post(create_analysis))
        .route("/api/analysis/", get(list_analyses).post(create_analysis))
        .route("/api/analysis/:id", get(get_analysis).delete(delete_analysis))
}
