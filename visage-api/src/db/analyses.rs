//! Analysis record store
//!
//! Sole owner of the `analysis_results` table. Each create is one INSERT, so
//! a record is either fully visible or absent. Status and overall score are
//! recomputed from the stored sub-scores on every read.

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;
use visage_common::{ids, time};

use crate::models::{
    is_valid_score, AdditionalScores, AnalysisRecord, AnalysisSummary, DetailedScores,
    NewAnalysis,
};
use crate::services::classifier;

/// Record store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Analysis not found: {0}")]
    NotFound(Uuid),

    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("Rejected record: {0}")]
    InvalidRecord(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "NOT_FOUND",
            StoreError::Unavailable(_) => "STORAGE_UNAVAILABLE",
            StoreError::Corrupt(_) => "STORAGE_CORRUPT",
            StoreError::InvalidRecord(_) => "INVALID_RECORD",
        }
    }
}

const SCORE_COLUMNS: &str = "symmetry_score, proportion_score, skin_quality_score, \
     features_harmony_score, eye_appeal_score, nose_harmony_score, lip_aesthetics_score, \
     jawline_definition_score, cheekbone_prominence_score, facial_composition_score";

/// Persistent store for analysis records
#[derive(Clone)]
pub struct AnalysisStore {
    pool: SqlitePool,
}

impl AnalysisStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Assign id and timestamp, persist, and return the full record
    pub async fn create(&self, content: NewAnalysis) -> Result<AnalysisRecord, StoreError> {
        if !content.scores_in_range() {
            return Err(StoreError::InvalidRecord(
                "sub-scores must lie in [0, 10]".to_string(),
            ));
        }

        let record = AnalysisRecord::assemble(ids::generate(), time::now(), content);
        let d = record.detailed_scores();
        let a = record.additional_scores();

        sqlx::query(
            r#"
            INSERT INTO analysis_results (
                id, filename, status, overall_score,
                symmetry_score, proportion_score, skin_quality_score, features_harmony_score,
                eye_appeal_score, nose_harmony_score, lip_aesthetics_score,
                jawline_definition_score, cheekbone_prominence_score, facial_composition_score,
                scientific_explanation, recommendations, ai_model, processing_time_ms, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id().to_string())
        .bind(record.filename())
        .bind(record.status().as_str())
        .bind(record.overall_score())
        .bind(d.symmetry)
        .bind(d.proportions)
        .bind(d.skin_quality)
        .bind(d.features_harmony)
        .bind(a.eye_appeal)
        .bind(a.nose_harmony)
        .bind(a.lip_aesthetics)
        .bind(a.jawline_definition)
        .bind(a.cheekbone_prominence)
        .bind(a.facial_composition)
        .bind(record.scientific_explanation())
        .bind(record.recommendations())
        .bind(record.ai_model())
        .bind(i64::try_from(record.processing_time_ms()).unwrap_or(i64::MAX))
        .bind(time::to_storage(&record.created_at()))
        .execute(&self.pool)
        .await?;

        debug!(analysis_id = %record.id(), "Stored analysis record");
        Ok(record)
    }

    /// Fetch one full record
    pub async fn get(&self, id: Uuid) -> Result<AnalysisRecord, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT id, filename, {}, scientific_explanation, recommendations, ai_model, \
             processing_time_ms, created_at FROM analysis_results WHERE id = ?",
            SCORE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        record_from_row(&row)
    }

    /// Summaries of all records, newest first
    ///
    /// Ties on `created_at` fall back to insertion order, newest first.
    pub async fn list(&self) -> Result<Vec<AnalysisSummary>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT id, created_at, {} FROM analysis_results \
             ORDER BY created_at DESC, rowid DESC",
            SCORE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<AnalysisSummary, StoreError> {
                let (detailed, additional) = scores_from_row(row)?;
                Ok(AnalysisSummary {
                    id: id_from_row(row)?,
                    overall_score: classifier::overall_score(&detailed, &additional),
                    created_at: created_at_from_row(row)?,
                })
            })
            .collect()
    }

    /// Hard delete
    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM analysis_results WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        debug!(analysis_id = %id, "Deleted analysis record");
        Ok(())
    }

    /// Overall score of every record (input to the statistics aggregator)
    pub async fn overall_scores(&self) -> Result<Vec<f64>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {} FROM analysis_results", SCORE_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<f64, StoreError> {
                let (detailed, additional) = scores_from_row(row)?;
                Ok(classifier::overall_score(&detailed, &additional))
            })
            .collect()
    }

    /// Number of stored records
    pub async fn count(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM analysis_results")
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.get("n");
        Ok(n.max(0) as u64)
    }
}

fn id_from_row(row: &SqliteRow) -> Result<Uuid, StoreError> {
    let raw: String = row.try_get("id")?;
    ids::parse(&raw).ok_or_else(|| StoreError::Corrupt(format!("invalid id '{}'", raw)))
}

fn created_at_from_row(row: &SqliteRow) -> Result<chrono::DateTime<chrono::Utc>, StoreError> {
    let raw: String = row.try_get("created_at")?;
    time::from_storage(&raw)
        .map_err(|e| StoreError::Corrupt(format!("invalid created_at '{}': {}", raw, e)))
}

fn score(row: &SqliteRow, column: &str) -> Result<f64, StoreError> {
    let value: f64 = row.try_get(column)?;
    if !is_valid_score(value) {
        return Err(StoreError::Corrupt(format!("{} = {} out of range", column, value)));
    }
    Ok(value)
}

fn scores_from_row(row: &SqliteRow) -> Result<(DetailedScores, AdditionalScores), StoreError> {
    Ok((
        DetailedScores {
            symmetry: score(row, "symmetry_score")?,
            proportions: score(row, "proportion_score")?,
            skin_quality: score(row, "skin_quality_score")?,
            features_harmony: score(row, "features_harmony_score")?,
        },
        AdditionalScores {
            eye_appeal: score(row, "eye_appeal_score")?,
            nose_harmony: score(row, "nose_harmony_score")?,
            lip_aesthetics: score(row, "lip_aesthetics_score")?,
            jawline_definition: score(row, "jawline_definition_score")?,
            cheekbone_prominence: score(row, "cheekbone_prominence_score")?,
            facial_composition: score(row, "facial_composition_score")?,
        },
    ))
}

fn record_from_row(row: &SqliteRow) -> Result<AnalysisRecord, StoreError> {
    let (detailed_scores, additional_scores) = scores_from_row(row)?;
    let processing_time_ms: i64 = row.try_get("processing_time_ms")?;

    let content = NewAnalysis {
        detailed_scores,
        additional_scores,
        scientific_explanation: row.try_get("scientific_explanation")?,
        recommendations: row.try_get("recommendations")?,
        filename: row.try_get("filename")?,
        ai_model: row.try_get("ai_model")?,
        processing_time_ms: u64::try_from(processing_time_ms).map_err(|_| {
            StoreError::Corrupt(format!("negative processing_time_ms {}", processing_time_ms))
        })?,
    };

    Ok(AnalysisRecord::assemble(
        id_from_row(row)?,
        created_at_from_row(row)?,
        content,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeasibilityStatus;
    use visage_common::db::init_memory_database;

    fn content(score: f64) -> NewAnalysis {
        NewAnalysis {
            detailed_scores: DetailedScores {
                symmetry: score,
                proportions: score,
                skin_quality: score,
                features_harmony: score,
            },
            additional_scores: AdditionalScores {
                eye_appeal: score,
                nose_harmony: score,
                lip_aesthetics: score,
                jawline_definition: score,
                cheekbone_prominence: score,
                facial_composition: score,
            },
            scientific_explanation: "Symmetric features.".to_string(),
            recommendations: "None.".to_string(),
            filename: "face.png".to_string(),
            ai_model: "test-model".to_string(),
            processing_time_ms: 120,
        }
    }

    async fn store() -> AnalysisStore {
        AnalysisStore::new(init_memory_database().await.unwrap())
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let store = store().await;
        let created = store.create(content(8.0)).await.unwrap();

        let fetched = store.get(created.id()).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.status(), FeasibilityStatus::Feasible);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let store = store().await;
        let a = store.create(content(5.0)).await.unwrap();
        let b = store.create(content(5.0)).await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let store = store().await;
        let id = Uuid::new_v4();
        assert!(matches!(store.get(id).await, Err(StoreError::NotFound(x)) if x == id));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let store = store().await;
        let created = store.create(content(5.0)).await.unwrap();

        store.delete(created.id()).await.unwrap();
        assert!(matches!(store.get(created.id()).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(created.id()).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = store().await;
        let first = store.create(content(1.0)).await.unwrap();
        let second = store.create(content(2.0)).await.unwrap();
        let third = store.create(content(3.0)).await.unwrap();

        let ids: Vec<Uuid> = store.list().await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![third.id(), second.id(), first.id()]);
    }

    #[tokio::test]
    async fn test_list_tie_breaks_by_insertion_order() {
        let store = store().await;
        let ts = "2025-01-01T00:00:00.000000Z";
        for (id, n) in [("00000000-0000-4000-8000-000000000001", 1), ("00000000-0000-4000-8000-000000000002", 2)] {
            sqlx::query(&format!(
                "INSERT INTO analysis_results (id, filename, status, overall_score, {}, \
                 scientific_explanation, recommendations, ai_model, processing_time_ms, created_at) \
                 VALUES (?, 'f.jpg', 'denied', 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, '', '', 'm', ?, ?)",
                SCORE_COLUMNS
            ))
            .bind(id)
            .bind(n)
            .bind(ts)
            .execute(store.pool())
            .await
            .unwrap();
        }

        let list = store.list().await.unwrap();
        assert_eq!(list[0].id.to_string(), "00000000-0000-4000-8000-000000000002");
        assert_eq!(list[1].id.to_string(), "00000000-0000-4000-8000-000000000001");
    }

    #[tokio::test]
    async fn test_create_rejects_out_of_range_scores() {
        let store = store().await;
        let mut bad = content(5.0);
        bad.detailed_scores.symmetry = 12.0;
        assert!(matches!(store.create(bad).await, Err(StoreError::InvalidRecord(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_status_recomputed_on_read() {
        let store = store().await;
        let created = store.create(content(5.0)).await.unwrap();

        // A stale stored status must not leak out
        sqlx::query("UPDATE analysis_results SET status = 'feasible', overall_score = 9.9 WHERE id = ?")
            .bind(created.id().to_string())
            .execute(store.pool())
            .await
            .unwrap();

        let fetched = store.get(created.id()).await.unwrap();
        assert_eq!(fetched.status(), FeasibilityStatus::Improvable);
        assert_eq!(fetched.overall_score(), 5.0);
        assert_eq!(store.overall_scores().await.unwrap(), vec![5.0]);
    }

    #[tokio::test]
    async fn test_concurrent_creates_are_all_persisted() {
        let store = store().await;
        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(content(i as f64)).await.unwrap()
            }));
        }
        for handle in handles {
            let record = handle.await.unwrap();
            assert_eq!(store.get(record.id()).await.unwrap(), record);
        }
        assert_eq!(store.count().await.unwrap(), 10);
    }
}
