//! SQLite-backed [`ReportStore`] implementation.
//!
//! Reads the flattened `reports` table created by `migrate`. Embeddings
//! are decoded from little-endian f32 BLOBs; timestamps are Unix seconds.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::embedding::blob_to_vec;
use crate::error::{Error, Result};
use crate::models::{ReportRecord, ReportStatus};

use super::{CorpusStats, ReportStore, SnapshotFilter};

const REPORT_COLUMNS: &str = "id, latitude, longitude, address_text, description, \
     reported_at, status, waste_type, severity_score, confidence_score, embedding";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn report_from_row(row: &SqliteRow) -> Result<ReportRecord> {
    let status_text: String = row.get("status");
    let reported_at_ts: i64 = row.get("reported_at");
    let reported_at: DateTime<Utc> = DateTime::from_timestamp(reported_at_ts, 0)
        .ok_or_else(|| Error::Validation(format!("invalid timestamp: {reported_at_ts}")))?;
    let embedding: Option<Vec<u8>> = row.get("embedding");

    Ok(ReportRecord {
        id: row.get("id"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        address_text: row.get("address_text"),
        description: row.get("description"),
        reported_at,
        status: ReportStatus::parse(&status_text)?,
        waste_type: row.get("waste_type"),
        severity_score: row.get("severity_score"),
        confidence_score: row.get("confidence_score"),
        embedding: embedding.map(|blob| blob_to_vec(&blob)),
    })
}

#[async_trait]
impl ReportStore for SqliteStore {
    async fn snapshot(&self, filter: &SnapshotFilter) -> Result<Vec<ReportRecord>> {
        let since = (Utc::now() - Duration::days(filter.window_days)).timestamp();

        let placeholders = filter
            .statuses
            .iter()
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports \
             WHERE embedding IS NOT NULL AND reported_at >= ? AND status IN ({placeholders}) \
             ORDER BY reported_at DESC, id ASC"
        );

        let mut query = sqlx::query(&sql).bind(since);
        for status in &filter.statuses {
            query = query.bind(status.as_str());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(report_from_row).collect()
    }

    async fn report(&self, id: i64) -> Result<Option<ReportRecord>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(report_from_row).transpose()
    }

    async fn comparable(&self, exclude: Option<i64>) -> Result<Vec<ReportRecord>> {
        let rows = match exclude {
            Some(id) => {
                let sql = format!(
                    "SELECT {REPORT_COLUMNS} FROM reports \
                     WHERE embedding IS NOT NULL AND id != ? ORDER BY id ASC"
                );
                sqlx::query(&sql).bind(id).fetch_all(&self.pool).await?
            }
            None => {
                let sql = format!(
                    "SELECT {REPORT_COLUMNS} FROM reports \
                     WHERE embedding IS NOT NULL ORDER BY id ASC"
                );
                sqlx::query(&sql).fetch_all(&self.pool).await?
            }
        };
        rows.iter().map(report_from_row).collect()
    }

    async fn coordinates(&self, exclude: Option<i64>) -> Result<Vec<(f64, f64)>> {
        let rows = match exclude {
            Some(id) => {
                sqlx::query("SELECT latitude, longitude FROM reports WHERE id != ?")
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT latitude, longitude FROM reports")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows
            .iter()
            .map(|row| (row.get("latitude"), row.get("longitude")))
            .collect())
    }

    async fn corpus_stats(&self) -> Result<CorpusStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_searchable_reports,
                COUNT(DISTINCT waste_type) AS waste_types_available,
                COALESCE(AVG(confidence_score), 0.0) AS avg_confidence
            FROM reports
            WHERE embedding IS NOT NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CorpusStats {
            total_searchable_reports: row.get("total_searchable_reports"),
            waste_types_available: row.get("waste_types_available"),
            avg_confidence: row.get("avg_confidence"),
        })
    }
}
