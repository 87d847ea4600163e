//! Report corpus access.
//!
//! The [`ReportStore`] trait is the engine's only view of the platform's
//! relational store. Every query operation fetches an immutable snapshot
//! through it at the start of the request and never writes back.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::models::{ReportRecord, ReportStatus};

/// Filter describing which reports enter a corpus snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotFilter {
    /// Only reports from the last `window_days` days.
    pub window_days: i64,
    /// Eligible lifecycle statuses.
    pub statuses: Vec<ReportStatus>,
}

impl SnapshotFilter {
    /// The clustering default: settled reports from the last `days` days.
    pub fn settled_last_days(days: i64) -> Self {
        Self {
            window_days: days,
            statuses: vec![ReportStatus::Analyzed, ReportStatus::Resolved],
        }
    }
}

/// Aggregate stats over the comparable (embedded) corpus.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub total_searchable_reports: i64,
    pub waste_types_available: i64,
    /// Mean stored confidence score; 0.0 when no scores exist.
    pub avg_confidence: f64,
}

/// Abstract read-only corpus backend.
///
/// All snapshot queries return only reports that carry an embedding —
/// reports without one are never comparable — in the engine's fixed
/// iteration order.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`snapshot`](ReportStore::snapshot) | Time-windowed, status-filtered snapshot (`reported_at DESC, id ASC`) |
/// | [`report`](ReportStore::report) | Single report by id, embedding included |
/// | [`comparable`](ReportStore::comparable) | All embedded reports, optionally excluding one id (`id ASC`) |
/// | [`corpus_stats`](ReportStore::corpus_stats) | Counts and mean confidence over the comparable corpus |
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Fetch the clustering snapshot for the given filter.
    async fn snapshot(&self, filter: &SnapshotFilter) -> Result<Vec<ReportRecord>>;

    /// Fetch one report by id, regardless of embedding presence.
    async fn report(&self, id: i64) -> Result<Option<ReportRecord>>;

    /// Fetch every report with an embedding, optionally excluding one id.
    async fn comparable(&self, exclude: Option<i64>) -> Result<Vec<ReportRecord>>;

    /// Fetch the coordinates of every report (embedded or not),
    /// optionally excluding one id. Used for proximity counts.
    async fn coordinates(&self, exclude: Option<i64>) -> Result<Vec<(f64, f64)>>;

    /// Aggregate stats over the comparable corpus.
    async fn corpus_stats(&self) -> Result<CorpusStats>;
}
