//! Core data models for the similarity and clustering engine.
//!
//! [`ReportRecord`] is the engine's read-only snapshot of a citizen waste
//! report: the row the platform stores plus the optional image embedding
//! produced by its analysis pipeline. Optional fields are modeled as real
//! `Option`s rather than maybe-present keys. The engine never mutates a
//! record.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Error;

/// Lifecycle status of a report in the platform.
///
/// Only `Analyzed` and `Resolved` reports enter clustering snapshots —
/// they represent a settled state with a completed analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Submitted,
    Analyzing,
    Analyzed,
    Resolved,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Submitted => "submitted",
            ReportStatus::Analyzing => "analyzing",
            ReportStatus::Analyzed => "analyzed",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "submitted" => Ok(ReportStatus::Submitted),
            "analyzing" => Ok(ReportStatus::Analyzing),
            "analyzed" => Ok(ReportStatus::Analyzed),
            "resolved" => Ok(ReportStatus::Resolved),
            "rejected" => Ok(ReportStatus::Rejected),
            other => Err(Error::Validation(format!("unknown report status: {other}"))),
        }
    }
}

/// A report row as read from storage, embedding included when present.
#[derive(Debug, Clone)]
pub struct ReportRecord {
    pub id: i64,
    /// WGS84 degrees.
    pub latitude: f64,
    /// WGS84 degrees.
    pub longitude: f64,
    pub address_text: Option<String>,
    pub description: Option<String>,
    pub reported_at: DateTime<Utc>,
    pub status: ReportStatus,
    pub waste_type: Option<String>,
    /// 1–10 scale from the analysis pipeline.
    pub severity_score: Option<f64>,
    /// 0–100 scale from the analysis pipeline.
    pub confidence_score: Option<f64>,
    /// Fixed-dimension image embedding; absent until analysis completes.
    pub embedding: Option<Vec<f32>>,
}

impl ReportRecord {
    /// Borrow the embedding, or fail with [`Error::NoEmbedding`].
    pub fn embedding(&self) -> Result<&[f32], Error> {
        self.embedding
            .as_deref()
            .ok_or(Error::NoEmbedding(self.id))
    }
}

/// Display-oriented projection of a report, without the raw vector.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub report_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub address_text: Option<String>,
    pub description: Option<String>,
    pub reported_at: DateTime<Utc>,
    pub status: ReportStatus,
    pub waste_type: Option<String>,
    pub severity_score: Option<f64>,
    pub confidence_score: Option<f64>,
}

impl From<&ReportRecord> for ReportSummary {
    fn from(r: &ReportRecord) -> Self {
        Self {
            report_id: r.id,
            latitude: r.latitude,
            longitude: r.longitude,
            address_text: r.address_text.clone(),
            description: r.description.clone(),
            reported_at: r.reported_at,
            status: r.status,
            waste_type: r.waste_type.clone(),
            severity_score: r.severity_score,
            confidence_score: r.confidence_score,
        }
    }
}

/// One ranked result: a report and its cosine distance to the query.
///
/// Distance is the engine's score direction everywhere: 0 = identical,
/// 2 = opposite, ascending = most similar first.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub report: ReportSummary,
    pub distance: f64,
}

/// Aggregate stats returned alongside a semantic search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchStats {
    pub query_results: usize,
    /// Reports with an embedding, i.e. the comparable corpus size.
    pub total_searchable_reports: i64,
    pub waste_types_available: i64,
    pub avg_confidence: f64,
    /// Echo of the caller's threshold; advisory, not a result filter.
    pub similarity_threshold: f64,
}

/// Full semantic-search response.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticSearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub stats: SearchStats,
}

/// Identifying details of the source report in a similar-reports query.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub report_id: i64,
    pub description: Option<String>,
    pub address_text: Option<String>,
    pub waste_type: Option<String>,
}

/// Full similar-reports response.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarReportsResponse {
    pub source: SourceSummary,
    pub results: Vec<SearchHit>,
    /// Other reports strictly within 1 km of the source. Contextual
    /// metadata, independent of the similarity ranking.
    pub nearby_count: usize,
    pub similarity_threshold: f64,
}

/// A member of an accepted cluster, with its distance to the seed.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterMember {
    #[serde(flatten)]
    pub report: ReportSummary,
    /// Cosine distance to the cluster seed; 0.0 for the seed itself.
    pub distance: f64,
}

/// Spatial/semantic shape of an accepted cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    /// Tight geography and strong similarity.
    Hotspot,
    /// Same waste type recurring across a wide area.
    Widespread,
    /// Near-duplicate incidents.
    Identical,
    Similar,
}

/// A group of mutually similar, geographically co-located reports.
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    /// 1-based id within a single run, assigned after final ordering.
    pub cluster_id: usize,
    pub members: Vec<ClusterMember>,
    /// Short synthesized summary: dominant waste type, representative
    /// location, average severity.
    pub centroid_description: String,
    /// Mean of `1 - distance` over members (cosine-similarity space).
    pub avg_similarity: f64,
    /// Max pairwise great-circle distance among members, kilometers.
    pub geographic_spread_km: f64,
    /// Distinct waste-type labels, first-seen order.
    pub waste_types: Vec<String>,
    pub pattern_type: PatternType,
    pub insights: Vec<String>,
    pub time_span_days: i64,
    /// Mean severity over members (missing scores count as 0).
    pub severity_level: f64,
    /// 0–100; stored confidence when present, otherwise derived from
    /// similarity strength and cluster size.
    pub confidence_level: f64,
}

/// Run statistics for one clustering pass.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterRunStats {
    /// Snapshot size considered.
    pub total_reports: i64,
    /// Reports assigned to an accepted cluster.
    pub processed_reports: usize,
    pub clusters_found: usize,
    pub similarity_threshold: f64,
    pub time_period_days: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Full clustering response.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterResponse {
    pub clusters: Vec<Cluster>,
    pub stats: ClusterRunStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for s in [
            ReportStatus::Submitted,
            ReportStatus::Analyzing,
            ReportStatus::Analyzed,
            ReportStatus::Resolved,
            ReportStatus::Rejected,
        ] {
            assert_eq!(ReportStatus::parse(s.as_str()).unwrap(), s);
        }
    }

    #[test]
    fn test_status_unknown_rejected() {
        assert!(ReportStatus::parse("archived").is_err());
    }

    #[test]
    fn test_missing_embedding_is_typed() {
        let record = ReportRecord {
            id: 7,
            latitude: -8.55,
            longitude: 125.56,
            address_text: None,
            description: None,
            reported_at: Utc::now(),
            status: ReportStatus::Analyzed,
            waste_type: None,
            severity_score: None,
            confidence_score: None,
            embedding: None,
        };
        match record.embedding() {
            Err(Error::NoEmbedding(id)) => assert_eq!(id, 7),
            other => panic!("expected NoEmbedding, got {other:?}"),
        }
    }
}
