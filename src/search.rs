//! Semantic search: rank the report corpus against a free-text query.
//!
//! The query text is embedded by the configured provider (the same
//! multimodal model that produced the stored image embeddings, so text
//! queries land in the image space) and the comparable corpus is ranked
//! by cosine distance, most similar first.

use std::collections::HashMap;

use anyhow::Result as AnyResult;

use crate::config::Config;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::models::{ReportSummary, SearchHit, SearchStats, SemanticSearchResponse};
use crate::similarity::rank;
use crate::store::sqlite::SqliteStore;
use crate::store::ReportStore;

/// Inputs for one semantic search.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    /// Clamped to `[1, MAX_RESULT_LIMIT]`.
    pub limit: i64,
    /// Must be within `[0, 1]`. Echoed in stats; not a result filter.
    pub threshold: f64,
}

/// Run a semantic search against a store.
///
/// # Errors
///
/// - [`Error::Validation`] for an empty query or out-of-range threshold.
/// - [`Error::EmbeddingUnavailable`] if the provider fails or times out;
///   retryable by the caller, not retried here.
pub async fn semantic_search<S: ReportStore + ?Sized>(
    store: &S,
    provider: &dyn EmbeddingProvider,
    params: &SearchParams,
) -> Result<SemanticSearchResponse> {
    if params.query.trim().is_empty() {
        return Err(Error::Validation("query text is required".to_string()));
    }
    if !(0.0..=1.0).contains(&params.threshold) {
        return Err(Error::Validation(
            "threshold must be in [0.0, 1.0]".to_string(),
        ));
    }

    let query_vec = provider.embed_text(&params.query).await?;

    let corpus = store.comparable(None).await?;
    let candidates: Vec<(i64, &[f32])> = corpus
        .iter()
        .filter_map(|r| r.embedding.as_deref().map(|v| (r.id, v)))
        .collect();

    let ranked = rank(&query_vec, &candidates, params.limit);

    let by_id: HashMap<i64, &_> = corpus.iter().map(|r| (r.id, r)).collect();
    let results: Vec<SearchHit> = ranked
        .iter()
        .filter_map(|(id, distance)| {
            by_id.get(id).map(|report| SearchHit {
                report: ReportSummary::from(*report),
                distance: *distance,
            })
        })
        .collect();

    let corpus_stats = store.corpus_stats().await?;

    Ok(SemanticSearchResponse {
        query: params.query.clone(),
        stats: SearchStats {
            query_results: results.len(),
            total_searchable_reports: corpus_stats.total_searchable_reports,
            waste_types_available: corpus_stats.waste_types_available,
            avg_confidence: corpus_stats.avg_confidence,
            similarity_threshold: params.threshold,
        },
        results,
    })
}

/// Run the search command: embed the query, rank the corpus, print.
pub async fn run_search(
    config: &Config,
    query: &str,
    limit: Option<i64>,
    threshold: Option<f64>,
    json: bool,
) -> AnyResult<()> {
    if !config.embedding.is_enabled() {
        anyhow::bail!("Semantic search requires embeddings. Set [embedding] provider in config.");
    }
    let provider = embedding::create_provider(&config.embedding)?;

    let params = SearchParams {
        query: query.to_string(),
        limit: limit.unwrap_or(config.search.default_limit),
        threshold: threshold.unwrap_or(config.search.default_threshold),
    };

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let response = semantic_search(&store, provider.as_ref(), &params).await?;
    pool.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in response.results.iter().enumerate() {
        println!(
            "{}. [{:.3}] #{} {}",
            i + 1,
            hit.distance,
            hit.report.report_id,
            hit.report.waste_type.as_deref().unwrap_or("(unclassified)")
        );
        if let Some(address) = &hit.report.address_text {
            println!("    address: {}", address);
        }
        if let Some(description) = &hit.report.description {
            println!("    note: {}", description.replace('\n', " "));
        }
        println!("    reported: {}", hit.report.reported_at.format("%Y-%m-%d"));
        println!();
    }

    println!(
        "{} of {} searchable reports ({} waste types, avg confidence {:.1})",
        response.stats.query_results,
        response.stats.total_searchable_reports,
        response.stats.waste_types_available,
        response.stats.avg_confidence
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportRecord, ReportStatus};
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;

    struct FixedProvider {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedProvider {
        fn model_name(&self) -> &str {
            "fixed-test-model"
        }
        fn dims(&self) -> usize {
            self.vector.len()
        }
        async fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.vector.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        fn model_name(&self) -> &str {
            "failing-test-model"
        }
        fn dims(&self) -> usize {
            0
        }
        async fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::EmbeddingUnavailable("timed out after 30s".into()))
        }
    }

    fn report(id: i64, waste_type: &str, embedding: Vec<f32>) -> ReportRecord {
        ReportRecord {
            id,
            latitude: -8.55,
            longitude: 125.56,
            address_text: Some(format!("Site {id}")),
            description: None,
            reported_at: Utc::now(),
            status: ReportStatus::Analyzed,
            waste_type: Some(waste_type.to_string()),
            severity_score: Some(5.0),
            confidence_score: Some(90.0),
            embedding: Some(embedding),
        }
    }

    fn params(query: &str) -> SearchParams {
        SearchParams {
            query: query.to_string(),
            limit: 10,
            threshold: 0.7,
        }
    }

    #[tokio::test]
    async fn test_exact_match_ranks_first_with_zero_distance() {
        let store = InMemoryStore::new();
        store.insert(report(1, "Plastic", vec![0.0, 1.0, 0.0]));
        store.insert(report(2, "Organic", vec![1.0, 0.0, 0.0]));
        store.insert(report(3, "Metal", vec![0.5, 0.5, 0.0]));

        let provider = FixedProvider {
            vector: vec![1.0, 0.0, 0.0],
        };
        let response = semantic_search(&store, &provider, &params("rusted scrap"))
            .await
            .unwrap();

        assert_eq!(response.results[0].report.report_id, 2);
        assert!(response.results[0].distance.abs() < 1e-9);
        // Ascending distance throughout.
        for pair in response.results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[tokio::test]
    async fn test_stats_describe_comparable_corpus() {
        let store = InMemoryStore::new();
        store.insert(report(1, "Plastic", vec![1.0, 0.0]));
        store.insert(report(2, "Plastic", vec![0.0, 1.0]));
        store.insert(report(3, "Organic", vec![0.7, 0.7]));

        let provider = FixedProvider {
            vector: vec![1.0, 0.0],
        };
        let response = semantic_search(&store, &provider, &params("plastic bags"))
            .await
            .unwrap();

        assert_eq!(response.stats.total_searchable_reports, 3);
        assert_eq!(response.stats.waste_types_available, 2);
        assert!((response.stats.avg_confidence - 90.0).abs() < 1e-9);
        assert!((response.stats.similarity_threshold - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let store = InMemoryStore::new();
        let provider = FixedProvider { vector: vec![1.0] };
        let result = semantic_search(&store, &provider, &params("   ")).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_threshold_rejected() {
        let store = InMemoryStore::new();
        let provider = FixedProvider { vector: vec![1.0] };
        let mut p = params("plastic");
        p.threshold = 1.5;
        assert!(matches!(
            semantic_search(&store, &provider, &p).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_failure_propagates_typed() {
        let store = InMemoryStore::new();
        store.insert(report(1, "Plastic", vec![1.0, 0.0]));

        let result = semantic_search(&store, &FailingProvider, &params("plastic")).await;
        assert!(matches!(result, Err(Error::EmbeddingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_limit_clamped() {
        let store = InMemoryStore::new();
        for id in 1..=60 {
            store.insert(report(id, "Plastic", vec![1.0, id as f32 / 100.0]));
        }

        let provider = FixedProvider {
            vector: vec![1.0, 0.0],
        };
        let mut p = params("plastic");
        p.limit = 500;
        let response = semantic_search(&store, &provider, &p).await.unwrap();
        assert_eq!(response.results.len(), 50);
    }
}
