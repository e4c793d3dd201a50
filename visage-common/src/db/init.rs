//! Database initialization
//!
//! Opens (creating if needed) the SQLite file and ensures the schema exists.
//! Schema creation is idempotent and runs on every start.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets list/stats readers proceed while a create is writing
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// The pool is pinned to a single connection that never expires, since every
/// new SQLite in-memory connection would otherwise see an empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index used by the service
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_analysis_results_table(pool).await?;
    Ok(())
}

/// Create the analysis_results table
///
/// One row per completed analysis. `status` and `overall_score` are stored
/// for ad-hoc querying but are recomputed from the sub-scores on read.
pub async fn create_analysis_results_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analysis_results (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            status TEXT NOT NULL,
            overall_score REAL NOT NULL,
            symmetry_score REAL NOT NULL,
            proportion_score REAL NOT NULL,
            skin_quality_score REAL NOT NULL,
            features_harmony_score REAL NOT NULL,
            eye_appeal_score REAL NOT NULL,
            nose_harmony_score REAL NOT NULL,
            lip_aesthetics_score REAL NOT NULL,
            jawline_definition_score REAL NOT NULL,
            cheekbone_prominence_score REAL NOT NULL,
            facial_composition_score REAL NOT NULL,
            scientific_explanation TEXT NOT NULL,
            recommendations TEXT NOT NULL,
            ai_model TEXT NOT NULL,
            processing_time_ms INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            CHECK (status IN ('denied', 'improvable', 'feasible')),
            CHECK (overall_score BETWEEN 0 AND 10),
            CHECK (symmetry_score BETWEEN 0 AND 10),
            CHECK (proportion_score BETWEEN 0 AND 10),
            CHECK (skin_quality_score BETWEEN 0 AND 10),
            CHECK (features_harmony_score BETWEEN 0 AND 10),
            CHECK (eye_appeal_score BETWEEN 0 AND 10),
            CHECK (nose_harmony_score BETWEEN 0 AND 10),
            CHECK (lip_aesthetics_score BETWEEN 0 AND 10),
            CHECK (jawline_definition_score BETWEEN 0 AND 10),
            CHECK (cheekbone_prominence_score BETWEEN 0 AND 10),
            CHECK (facial_composition_score BETWEEN 0 AND 10),
            CHECK (processing_time_ms >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_analysis_results_created_at ON analysis_results(created_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_analysis_results_created_score ON analysis_results(created_at, overall_score)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
