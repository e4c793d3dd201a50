//! Database initialization tests
//!
//! Covers automatic creation of the database file (and its parent
//! directories) and reopening an existing database without data loss.

use sqlx::Row;
use tempfile::TempDir;
use visage_common::db::init_database;

#[tokio::test]
async fn test_creates_database_and_parent_directories() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("data").join("visage.db");

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists());

    let row = sqlx::query("SELECT COUNT(*) AS n FROM analysis_results")
        .fetch_one(&pool)
        .await
        .unwrap();
    let n: i64 = row.get("n");
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_reopen_preserves_rows() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("visage.db");

    {
        let pool = init_database(&db_path).await.unwrap();
        sqlx::query(
            r#"
            INSERT INTO analysis_results (
                id, filename, status, overall_score,
                symmetry_score, proportion_score, skin_quality_score, features_harmony_score,
                eye_appeal_score, nose_harmony_score, lip_aesthetics_score,
                jawline_definition_score, cheekbone_prominence_score, facial_composition_score,
                scientific_explanation, recommendations, ai_model, processing_time_ms, created_at
            ) VALUES ('row-1', 'a.jpg', 'improvable', 5.0, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
                      'e', 'r', 'm', 12, '2025-01-01T00:00:00.000000Z')
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let row = sqlx::query("SELECT id FROM analysis_results")
        .fetch_one(&pool)
        .await
        .unwrap();
    let id: String = row.get("id");
    assert_eq!(id, "row-1");
}
