//! Similar-reports lookup: rank the corpus against a stored report.
//!
//! Uses the source report's stored embedding as the query vector, so no
//! provider call is involved. Alongside the ranking, a geographic
//! proximity count (other reports strictly within 1 km) gives reviewers
//! a sense of how busy the immediate area is, independent of semantic
//! similarity.

use std::collections::HashMap;

use anyhow::Result as AnyResult;
use tracing::warn;

use crate::config::Config;
use crate::db;
use crate::error::{Error, Result};
use crate::geo::count_within_radius;
use crate::models::{ReportSummary, SearchHit, SimilarReportsResponse, SourceSummary};
use crate::similarity::rank;
use crate::store::sqlite::SqliteStore;
use crate::store::ReportStore;

/// Radius for the contextual nearby-report count, kilometers.
const NEARBY_RADIUS_KM: f64 = 1.0;

/// Inputs for one similar-reports lookup.
#[derive(Debug, Clone)]
pub struct SimilarParams {
    /// Must be a positive report id.
    pub report_id: i64,
    /// Clamped to `[1, MAX_RESULT_LIMIT]`.
    pub limit: i64,
    /// Must be within `[0, 1]`. Echoed back; not a result filter.
    pub threshold: f64,
}

/// Find the reports most similar to a stored report.
///
/// # Errors
///
/// - [`Error::Validation`] for a non-positive id or out-of-range threshold.
/// - [`Error::ReportNotFound`] if the id is absent.
/// - [`Error::NoEmbedding`] if the report has no stored vector. There is
///   no fallback scoring: a report that cannot be compared is an error,
///   not a guess.
pub async fn similar_reports<S: ReportStore + ?Sized>(
    store: &S,
    params: &SimilarParams,
) -> Result<SimilarReportsResponse> {
    if params.report_id <= 0 {
        return Err(Error::Validation(
            "report id must be a positive integer".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&params.threshold) {
        return Err(Error::Validation(
            "threshold must be in [0.0, 1.0]".to_string(),
        ));
    }

    let source = store
        .report(params.report_id)
        .await?
        .ok_or(Error::ReportNotFound(params.report_id))?;
    let source_vec = source.embedding()?.to_vec();

    let others = store.comparable(Some(source.id)).await?;
    let candidates: Vec<(i64, &[f32])> = others
        .iter()
        .filter_map(|r| r.embedding.as_deref().map(|v| (r.id, v)))
        .collect();

    let ranked = rank(&source_vec, &candidates, params.limit);

    let by_id: HashMap<i64, &_> = others.iter().map(|r| (r.id, r)).collect();
    let results: Vec<SearchHit> = ranked
        .iter()
        .filter_map(|(id, distance)| {
            by_id.get(id).map(|report| SearchHit {
                report: ReportSummary::from(*report),
                distance: *distance,
            })
        })
        .collect();

    // Proximity context over every other report, embedded or not. A
    // source row with corrupt coordinates degrades to zero rather than
    // failing the whole lookup.
    let coordinates = store.coordinates(Some(source.id)).await?;
    let nearby_count = match count_within_radius(
        (source.latitude, source.longitude),
        &coordinates,
        NEARBY_RADIUS_KM,
    ) {
        Ok(count) => count,
        Err(e) => {
            warn!(report_id = source.id, error = %e, "source coordinates invalid; nearby count unavailable");
            0
        }
    };

    Ok(SimilarReportsResponse {
        source: SourceSummary {
            report_id: source.id,
            description: source.description.clone(),
            address_text: source.address_text.clone(),
            waste_type: source.waste_type.clone(),
        },
        results,
        nearby_count,
        similarity_threshold: params.threshold,
    })
}

/// Run the similar command: rank against a stored report and print.
pub async fn run_similar(
    config: &Config,
    report_id: i64,
    limit: Option<i64>,
    threshold: Option<f64>,
    json: bool,
) -> AnyResult<()> {
    let params = SimilarParams {
        report_id,
        limit: limit.unwrap_or(config.search.default_limit),
        threshold: threshold.unwrap_or(config.search.default_threshold),
    };

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let response = similar_reports(&store, &params).await?;
    pool.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!(
        "Source #{} — {} at {}",
        response.source.report_id,
        response.source.waste_type.as_deref().unwrap_or("(unclassified)"),
        response.source.address_text.as_deref().unwrap_or("(no address)")
    );
    println!(
        "{} reports within {} km of the source",
        response.nearby_count, NEARBY_RADIUS_KM
    );
    println!();

    if response.results.is_empty() {
        println!("No similar reports.");
        return Ok(());
    }

    for (i, hit) in response.results.iter().enumerate() {
        println!(
            "{}. [{:.3}] #{} {} — {}",
            i + 1,
            hit.distance,
            hit.report.report_id,
            hit.report.waste_type.as_deref().unwrap_or("(unclassified)"),
            hit.report.address_text.as_deref().unwrap_or("(no address)")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportRecord, ReportStatus};
    use crate::store::memory::InMemoryStore;
    use chrono::Utc;

    fn report(id: i64, lat: f64, lon: f64, embedding: Option<Vec<f32>>) -> ReportRecord {
        ReportRecord {
            id,
            latitude: lat,
            longitude: lon,
            address_text: Some(format!("Site {id}")),
            description: Some("overflowing bin".to_string()),
            reported_at: Utc::now(),
            status: ReportStatus::Analyzed,
            waste_type: Some("Plastic".to_string()),
            severity_score: Some(4.0),
            confidence_score: Some(75.0),
            embedding,
        }
    }

    fn params(report_id: i64) -> SimilarParams {
        SimilarParams {
            report_id,
            limit: 10,
            threshold: 0.75,
        }
    }

    #[tokio::test]
    async fn test_ranks_other_reports_excluding_source() {
        let store = InMemoryStore::new();
        store.insert(report(1, -8.55, 125.56, Some(vec![1.0, 0.0])));
        store.insert(report(2, -8.55, 125.56, Some(vec![0.9, 0.1])));
        store.insert(report(3, -8.55, 125.56, Some(vec![0.0, 1.0])));

        let response = similar_reports(&store, &params(1)).await.unwrap();
        assert_eq!(response.source.report_id, 1);
        let ids: Vec<i64> = response.results.iter().map(|h| h.report.report_id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(!ids.contains(&1), "source must not rank against itself");
    }

    #[tokio::test]
    async fn test_missing_report_is_not_found() {
        let store = InMemoryStore::new();
        match similar_reports(&store, &params(42)).await {
            Err(Error::ReportNotFound(42)) => {}
            other => panic!("expected ReportNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_report_without_embedding_fails_typed() {
        let store = InMemoryStore::new();
        store.insert(report(1, -8.55, 125.56, None));
        store.insert(report(2, -8.55, 125.56, Some(vec![1.0, 0.0])));

        match similar_reports(&store, &params(1)).await {
            Err(Error::NoEmbedding(1)) => {}
            other => panic!("expected NoEmbedding, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_positive_id_rejected() {
        let store = InMemoryStore::new();
        assert!(matches!(
            similar_reports(&store, &params(0)).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            similar_reports(&store, &params(-3)).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_nearby_count_is_strict_and_counts_unembedded() {
        let store = InMemoryStore::new();
        // Source at the equator-ish for easy distance math.
        store.insert(report(1, 0.0, 0.0, Some(vec![1.0, 0.0])));
        // ~0.56 km away, no embedding: counted for proximity, not ranked.
        store.insert(report(2, 0.0, 0.005, None));
        // ~2.2 km away: outside the 1 km radius.
        store.insert(report(3, 0.0, 0.02, Some(vec![0.9, 0.1])));

        let response = similar_reports(&store, &params(1)).await.unwrap();
        assert_eq!(response.nearby_count, 1);
        let ids: Vec<i64> = response.results.iter().map(|h| h.report.report_id).collect();
        assert_eq!(ids, vec![3], "unembedded report must not be ranked");
    }
}
