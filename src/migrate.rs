use anyhow::Result;

use crate::config::Config;
use crate::db;

/// Create the reports table and its indexes. Idempotent.
///
/// The platform's relational store keeps reports, analysis results, and
/// waste-type labels in separate tables; the engine reads a flattened
/// projection, so the local schema stores one row per report with the
/// analysis columns inline. Embeddings are little-endian f32 BLOBs.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id INTEGER PRIMARY KEY,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            address_text TEXT,
            description TEXT,
            reported_at INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'submitted',
            waste_type TEXT,
            severity_score REAL,
            confidence_score REAL,
            embedding BLOB
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_reported_at ON reports(reported_at DESC)")
        .execute(&pool)
        .await?;

    pool.close().await;
    Ok(())
}
