//! In-memory [`ReportStore`] implementation for unit tests.
//!
//! Applies the same filtering and ordering rules as the SQLite backend
//! over a `Vec` behind `std::sync::RwLock`.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::error::Result;
use crate::models::ReportRecord;

use super::{CorpusStats, ReportStore, SnapshotFilter};

/// In-memory store for tests.
pub struct InMemoryStore {
    reports: RwLock<Vec<ReportRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            reports: RwLock::new(Vec::new()),
        }
    }

    pub fn insert(&self, report: ReportRecord) {
        self.reports.write().unwrap().push(report);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn snapshot(&self, filter: &SnapshotFilter) -> Result<Vec<ReportRecord>> {
        let since = Utc::now() - Duration::days(filter.window_days);
        let reports = self.reports.read().unwrap();

        let mut out: Vec<ReportRecord> = reports
            .iter()
            .filter(|r| {
                r.embedding.is_some()
                    && r.reported_at >= since
                    && filter.statuses.contains(&r.status)
            })
            .cloned()
            .collect();

        out.sort_by(|a, b| b.reported_at.cmp(&a.reported_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn report(&self, id: i64) -> Result<Option<ReportRecord>> {
        let reports = self.reports.read().unwrap();
        Ok(reports.iter().find(|r| r.id == id).cloned())
    }

    async fn comparable(&self, exclude: Option<i64>) -> Result<Vec<ReportRecord>> {
        let reports = self.reports.read().unwrap();
        let mut out: Vec<ReportRecord> = reports
            .iter()
            .filter(|r| r.embedding.is_some() && Some(r.id) != exclude)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.id);
        Ok(out)
    }

    async fn coordinates(&self, exclude: Option<i64>) -> Result<Vec<(f64, f64)>> {
        let reports = self.reports.read().unwrap();
        Ok(reports
            .iter()
            .filter(|r| Some(r.id) != exclude)
            .map(|r| (r.latitude, r.longitude))
            .collect())
    }

    async fn corpus_stats(&self) -> Result<CorpusStats> {
        let reports = self.reports.read().unwrap();
        let embedded: Vec<&ReportRecord> =
            reports.iter().filter(|r| r.embedding.is_some()).collect();

        let mut waste_types: Vec<&str> = embedded
            .iter()
            .filter_map(|r| r.waste_type.as_deref())
            .collect();
        waste_types.sort_unstable();
        waste_types.dedup();

        let confidences: Vec<f64> = embedded.iter().filter_map(|r| r.confidence_score).collect();
        let avg_confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f64>() / confidences.len() as f64
        };

        Ok(CorpusStats {
            total_searchable_reports: embedded.len() as i64,
            waste_types_available: waste_types.len() as i64,
            avg_confidence,
        })
    }
}
