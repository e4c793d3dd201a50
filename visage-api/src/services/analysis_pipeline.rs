//! Analysis write path
//!
//! validate → score (bounded by a timeout) → classify → persist.
//!
//! The oracle call is the only long suspension point and holds no shared
//! lock. If the caller's future is dropped while the oracle call is
//! outstanding, the call is cancelled with it and the store write never runs,
//! so no partial record can appear.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use super::oracle_client::{OracleAssessment, OracleError, ScoringOracle};
use super::upload_validator::{UploadError, UploadLimits, ValidatedImage};
use crate::db::analyses::{AnalysisStore, StoreError};
use crate::models::{AnalysisRecord, NewAnalysis};

/// Failure anywhere on the write path
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Raw upload as received from the transport
#[derive(Debug, Clone, Default)]
pub struct RawUpload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

/// Orchestrates the create-analysis write path
pub struct AnalysisPipeline {
    oracle: Arc<dyn ScoringOracle>,
    store: AnalysisStore,
    limits: UploadLimits,
    oracle_timeout: Duration,
}

impl AnalysisPipeline {
    pub fn new(
        oracle: Arc<dyn ScoringOracle>,
        store: AnalysisStore,
        limits: UploadLimits,
        oracle_timeout: Duration,
    ) -> Self {
        Self {
            oracle,
            store,
            limits,
            oracle_timeout,
        }
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Run the full write path for one upload
    pub async fn analyze(&self, upload: RawUpload) -> Result<AnalysisRecord, PipelineError> {
        // Decoding is CPU bound; keep it off the async workers
        let limits = self.limits.clone();
        let image = tokio::task::spawn_blocking(move || {
            limits.validate(
                upload.bytes,
                upload.content_type.as_deref(),
                upload.filename.as_deref(),
            )
        })
        .await
        .map_err(|e| UploadError::Malformed(format!("validation task failed: {}", e)))??;

        let (assessment, elapsed) = self.score(&image).await?;

        let content = NewAnalysis {
            detailed_scores: assessment.detailed_scores,
            additional_scores: assessment.additional_scores,
            scientific_explanation: assessment.scientific_explanation,
            recommendations: assessment.recommendations,
            filename: image.filename().to_string(),
            ai_model: self.oracle.model_name().to_string(),
            processing_time_ms: elapsed.as_millis().try_into().unwrap_or(u64::MAX),
        };

        let record = self.store.create(content).await?;

        info!(
            analysis_id = %record.id(),
            overall_score = record.overall_score(),
            status = %record.status(),
            elapsed_ms = record.processing_time_ms(),
            "Analysis created"
        );

        Ok(record)
    }

    /// Call the oracle with the configured timeout
    pub async fn score(
        &self,
        image: &ValidatedImage,
    ) -> Result<(OracleAssessment, Duration), OracleError> {
        let started = Instant::now();

        let outcome = tokio::time::timeout(self.oracle_timeout, self.oracle.score(image)).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(Ok(assessment)) => Ok((assessment, elapsed)),
            Ok(Err(err)) => {
                warn!(code = err.code(), elapsed_ms = elapsed.as_millis() as u64, "Oracle call failed: {}", err);
                Err(err)
            }
            Err(_) => {
                warn!(timeout_ms = self.oracle_timeout.as_millis() as u64, "Oracle call timed out");
                Err(OracleError::Timeout(self.oracle_timeout))
            }
        }
    }
}
