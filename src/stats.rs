//! Corpus statistics and health overview.
//!
//! Provides a quick summary of what the engine can work with: report
//! counts, embedding coverage, and status/waste-type breakdowns. Used by
//! `wst stats` to give confidence that the corpus is in shape for search
//! and clustering.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

struct Breakdown {
    label: String,
    count: i64,
    embedded_count: i64,
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_reports: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
        .fetch_one(&pool)
        .await?;

    let total_embedded: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE embedding IS NOT NULL")
            .fetch_one(&pool)
            .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("WasteSight — Corpus Stats");
    println!("=========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Reports:     {}", total_reports);
    println!(
        "  Embedded:    {} / {} ({}%)",
        total_embedded,
        total_reports,
        if total_reports > 0 {
            (total_embedded * 100) / total_reports
        } else {
            0
        }
    );

    let status_rows = sqlx::query(
        r#"
        SELECT
            status AS label,
            COUNT(*) AS count,
            SUM(CASE WHEN embedding IS NOT NULL THEN 1 ELSE 0 END) AS embedded_count
        FROM reports
        GROUP BY status
        ORDER BY count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    print_breakdown("By status:", &to_breakdowns(&status_rows));

    let type_rows = sqlx::query(
        r#"
        SELECT
            COALESCE(waste_type, '(unclassified)') AS label,
            COUNT(*) AS count,
            SUM(CASE WHEN embedding IS NOT NULL THEN 1 ELSE 0 END) AS embedded_count
        FROM reports
        GROUP BY waste_type
        ORDER BY count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    print_breakdown("By waste type:", &to_breakdowns(&type_rows));

    println!();

    pool.close().await;
    Ok(())
}

fn to_breakdowns(rows: &[sqlx::sqlite::SqliteRow]) -> Vec<Breakdown> {
    rows.iter()
        .map(|row| Breakdown {
            label: row.get("label"),
            count: row.get("count"),
            embedded_count: row.get::<Option<i64>, _>("embedded_count").unwrap_or(0),
        })
        .collect()
}

fn print_breakdown(title: &str, rows: &[Breakdown]) {
    if rows.is_empty() {
        return;
    }
    println!();
    println!("  {}", title);
    println!("  {:<24} {:>8} {:>10}", "", "REPORTS", "EMBEDDED");
    println!("  {}", "-".repeat(46));
    for row in rows {
        println!(
            "  {:<24} {:>8} {:>10}",
            row.label, row.count, row.embedded_count
        );
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
