//! Greedy single-seed clustering over a corpus snapshot.
//!
//! The engine walks the snapshot in store order (`reported_at DESC,
//! id ASC`), treats each unassigned report as a cluster seed, and pulls
//! in every other eligible report within the distance cutoff of the
//! seed's embedding. Candidates that reach `min_cluster_size` are
//! accepted and their members leave the pool; smaller candidates are
//! dropped and the failed seed is permanently discarded, so a run is
//! fully determined by the snapshot and parameters.
//!
//! Accepted clusters carry the hotspot metadata the dashboards consume:
//! centroid description, average similarity, geographic spread, pattern
//! type, insights, time span, severity and confidence levels.

use std::collections::HashSet;

use anyhow::Result as AnyResult;
use tracing::warn;

use crate::config::Config;
use crate::db;
use crate::error::{Error, Result};
use crate::geo::haversine_km;
use crate::models::{
    Cluster, ClusterMember, ClusterResponse, ClusterRunStats, PatternType, ReportRecord,
    ReportSummary,
};
use crate::similarity::{cosine_distance, distance_cutoff};
use crate::store::sqlite::SqliteStore;
use crate::store::{ReportStore, SnapshotFilter};

/// Tuning parameters for one clustering run.
#[derive(Debug, Clone)]
pub struct ClusterParams {
    /// Minimum accepted cluster size; ≥ 2.
    pub min_cluster_size: usize,
    /// Maximum number of accepted clusters; ≥ 1.
    pub max_clusters: usize,
    /// Similarity threshold in (0, 1]; converted to a distance cutoff.
    pub similarity_threshold: f64,
    /// Snapshot time window in days; ≥ 1.
    pub window_days: i64,
}

impl ClusterParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_cluster_size: config.clustering.min_cluster_size,
            max_clusters: config.clustering.max_clusters,
            similarity_threshold: config.clustering.similarity_threshold,
            window_days: config.clustering.window_days,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_cluster_size < 2 {
            return Err(Error::Validation(
                "min_cluster_size must be >= 2".to_string(),
            ));
        }
        if self.max_clusters < 1 {
            return Err(Error::Validation(
                "max_clusters must be >= 1".to_string(),
            ));
        }
        if self.similarity_threshold <= 0.0 || self.similarity_threshold > 1.0 {
            return Err(Error::Validation(
                "similarity_threshold must be in (0, 1]".to_string(),
            ));
        }
        if self.window_days < 1 {
            return Err(Error::Validation(
                "window_days must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Run the clustering operation against a store.
///
/// Fetches the settled-report snapshot for the window, runs
/// [`build_clusters`] over it, and wraps the result with run statistics.
/// A snapshot smaller than `min_cluster_size` yields an empty cluster
/// list with an explanatory message, not an error.
pub async fn cluster_reports<S: ReportStore + ?Sized>(
    store: &S,
    params: &ClusterParams,
) -> Result<ClusterResponse> {
    params.validate()?;

    let snapshot = store
        .snapshot(&SnapshotFilter::settled_last_days(params.window_days))
        .await?;

    if snapshot.len() < params.min_cluster_size {
        return Ok(ClusterResponse {
            clusters: Vec::new(),
            stats: ClusterRunStats {
                total_reports: snapshot.len() as i64,
                processed_reports: 0,
                clusters_found: 0,
                similarity_threshold: params.similarity_threshold,
                time_period_days: params.window_days,
                message: Some("insufficient reports for clustering analysis".to_string()),
            },
        });
    }

    let (clusters, assigned) = build_clusters(&snapshot, params);
    let clusters_found = clusters.len();

    Ok(ClusterResponse {
        clusters,
        stats: ClusterRunStats {
            total_reports: snapshot.len() as i64,
            processed_reports: assigned,
            clusters_found,
            similarity_threshold: params.similarity_threshold,
            time_period_days: params.window_days,
            message: None,
        },
    })
}

/// Greedy clustering pass over an immutable snapshot.
///
/// The snapshot's order is the iteration order; callers pass it as the
/// store returns it. Returns the accepted clusters (sorted by member
/// count desc, then average similarity desc, ids renumbered 1..n) and
/// the number of reports assigned to a cluster.
///
/// A pair whose distance cannot be computed (corrupt vector) is logged
/// and excluded from the candidate set; one bad row never aborts a run.
pub fn build_clusters(snapshot: &[ReportRecord], params: &ClusterParams) -> (Vec<Cluster>, usize) {
    let cutoff = distance_cutoff(params.similarity_threshold);
    let mut assigned: HashSet<i64> = HashSet::new();
    let mut discarded: HashSet<i64> = HashSet::new();
    let mut clusters: Vec<Cluster> = Vec::new();

    for seed in snapshot {
        if clusters.len() >= params.max_clusters {
            break;
        }
        if assigned.contains(&seed.id) || discarded.contains(&seed.id) {
            continue;
        }
        let Some(seed_vec) = seed.embedding.as_deref() else {
            continue;
        };

        // Seed is its own first member at distance 0.
        let mut members: Vec<(&ReportRecord, f64)> = vec![(seed, 0.0)];

        for other in snapshot {
            if other.id == seed.id
                || assigned.contains(&other.id)
                || discarded.contains(&other.id)
            {
                continue;
            }
            let Some(other_vec) = other.embedding.as_deref() else {
                continue;
            };
            match cosine_distance(seed_vec, other_vec) {
                Ok(d) if d <= cutoff => members.push((other, d)),
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        seed_id = seed.id,
                        candidate_id = other.id,
                        error = %e,
                        "excluding pair from candidate set"
                    );
                }
            }
        }

        if members.len() >= params.min_cluster_size {
            // Non-seed members ordered by distance to the seed.
            members[1..].sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            for (member, _) in &members {
                assigned.insert(member.id);
            }
            clusters.push(summarize(&members));
        } else {
            // Decision (b): a failed seed never returns, as seed or member.
            discarded.insert(seed.id);
        }
    }

    clusters.sort_by(|a, b| {
        b.members
            .len()
            .cmp(&a.members.len())
            .then(
                b.avg_similarity
                    .partial_cmp(&a.avg_similarity)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    for (i, cluster) in clusters.iter_mut().enumerate() {
        cluster.cluster_id = i + 1;
    }

    (clusters, assigned.len())
}

/// Derive the metadata of an accepted cluster from its members.
fn summarize(members: &[(&ReportRecord, f64)]) -> Cluster {
    let count = members.len();

    let mut waste_types: Vec<String> = Vec::new();
    for (report, _) in members {
        if let Some(wt) = &report.waste_type {
            if !waste_types.iter().any(|w| w == wt) {
                waste_types.push(wt.clone());
            }
        }
    }

    // Cosine-similarity space: mean of 1 - distance over members.
    let avg_similarity =
        members.iter().map(|(_, d)| 1.0 - d).sum::<f64>() / count as f64;
    let avg_distance = 1.0 - avg_similarity;

    let spread_km = geographic_spread(members);
    let severity_level = members
        .iter()
        .map(|(r, _)| r.severity_score.unwrap_or(0.0))
        .sum::<f64>()
        / count as f64;
    let time_span_days = time_span_days(members);

    let confidences: Vec<f64> = members
        .iter()
        .map(|(r, _)| r.confidence_score.unwrap_or(0.0))
        .collect();
    let confidence_level = if confidences.iter().any(|c| *c > 0.0) {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    } else {
        // No stored scores: derive from similarity strength plus a
        // cluster-size bonus (10 per member, capped at 20), capped at 95.
        let size_bonus = (count as f64 * 10.0).min(20.0);
        (avg_similarity * 100.0 + size_bonus).min(95.0)
    };

    let pattern_type = classify_pattern(&waste_types, avg_distance, spread_km);
    let insights = build_insights(count, avg_distance, spread_km, time_span_days, severity_level);

    let primary_type = waste_types
        .first()
        .map(String::as_str)
        .unwrap_or("Mixed waste");
    let location = members
        .iter()
        .find_map(|(r, _)| r.address_text.as_deref().filter(|a| !a.is_empty()))
        .unwrap_or("Various locations");
    let centroid_description = format!(
        "{primary_type} pattern detected with {count} similar incidents near {location}, avg severity {severity_level:.1}/10"
    );

    Cluster {
        cluster_id: 0, // renumbered after final ordering
        members: members
            .iter()
            .map(|(report, distance)| ClusterMember {
                report: ReportSummary::from(*report),
                distance: *distance,
            })
            .collect(),
        centroid_description,
        avg_similarity,
        geographic_spread_km: spread_km,
        waste_types,
        pattern_type,
        insights,
        time_span_days,
        severity_level,
        confidence_level,
    }
}

/// Max pairwise great-circle distance among members, kilometers.
///
/// O(n²) over cluster-sized inputs. A pair with invalid coordinates is
/// logged and skipped.
fn geographic_spread(members: &[(&ReportRecord, f64)]) -> f64 {
    let mut max_km: f64 = 0.0;
    for (j, (a, _)) in members.iter().enumerate() {
        for (b, _) in members.iter().skip(j + 1) {
            match haversine_km(a.latitude, a.longitude, b.latitude, b.longitude) {
                Ok(d) => max_km = max_km.max(d),
                Err(e) => {
                    warn!(a = a.id, b = b.id, error = %e, "skipping pair in spread computation");
                }
            }
        }
    }
    max_km
}

fn time_span_days(members: &[(&ReportRecord, f64)]) -> i64 {
    let oldest = members.iter().map(|(r, _)| r.reported_at).min();
    let newest = members.iter().map(|(r, _)| r.reported_at).max();
    match (oldest, newest) {
        (Some(oldest), Some(newest)) => {
            let days = (newest - oldest).num_seconds() as f64 / 86_400.0;
            (days.ceil() as i64).max(1)
        }
        _ => 1,
    }
}

fn classify_pattern(waste_types: &[String], avg_distance: f64, spread_km: f64) -> PatternType {
    if spread_km < 0.5 && avg_distance < 0.3 {
        PatternType::Hotspot
    } else if spread_km > 2.0 && waste_types.len() == 1 {
        PatternType::Widespread
    } else if avg_distance < 0.2 {
        PatternType::Identical
    } else {
        PatternType::Similar
    }
}

fn build_insights(
    count: usize,
    avg_distance: f64,
    spread_km: f64,
    time_span_days: i64,
    severity_level: f64,
) -> Vec<String> {
    let mut insights = Vec::with_capacity(4);

    let similarity_percent = ((1.0 - avg_distance) * 100.0).round() as i64;
    if similarity_percent > 80 {
        insights.push(format!(
            "Strong pattern detected ({similarity_percent}% similarity)"
        ));
    } else if similarity_percent > 60 {
        insights.push(format!(
            "Moderate pattern detected ({similarity_percent}% similarity)"
        ));
    } else {
        insights.push(format!(
            "Weak pattern detected ({similarity_percent}% similarity)"
        ));
    }

    if spread_km < 0.5 {
        insights.push(format!("Highly localized area ({spread_km:.1}km spread)"));
    } else if spread_km < 2.0 {
        insights.push(format!("Concentrated area ({spread_km:.1}km spread)"));
    } else {
        insights.push(format!("Widespread area ({spread_km:.1}km spread)"));
    }

    if time_span_days <= 7 {
        insights.push(format!(
            "Recent spike ({count} reports in {time_span_days} days)"
        ));
    } else if time_span_days <= 30 {
        insights.push(format!(
            "Recurring issue ({count} reports in {time_span_days} days)"
        ));
    } else {
        insights.push(format!(
            "Ongoing pattern ({count} reports over {time_span_days} days)"
        ));
    }

    if severity_level > 7.0 {
        insights.push(format!(
            "High severity incidents (avg {severity_level:.1}/10)"
        ));
    } else if severity_level > 4.0 {
        insights.push(format!(
            "Medium severity incidents (avg {severity_level:.1}/10)"
        ));
    } else {
        insights.push(format!(
            "Low severity incidents (avg {severity_level:.1}/10)"
        ));
    }

    insights
}

/// Run the cluster command: cluster the corpus and print the result.
pub async fn run_cluster(config: &Config, params: &ClusterParams, json: bool) -> AnyResult<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    let response = cluster_reports(&store, params).await?;
    pool.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.clusters.is_empty() {
        match &response.stats.message {
            Some(msg) => println!(
                "No clusters. {} ({} reports in window)",
                msg, response.stats.total_reports
            ),
            None => println!(
                "No clusters found among {} reports.",
                response.stats.total_reports
            ),
        }
        return Ok(());
    }

    for cluster in &response.clusters {
        println!(
            "Cluster {} — {} reports, avg similarity {:.3}, spread {:.2} km [{:?}]",
            cluster.cluster_id,
            cluster.members.len(),
            cluster.avg_similarity,
            cluster.geographic_spread_km,
            cluster.pattern_type,
        );
        println!("    {}", cluster.centroid_description);
        for insight in &cluster.insights {
            println!("    - {}", insight);
        }
        for member in &cluster.members {
            println!(
                "      #{} [{:.3}] {}",
                member.report.report_id,
                member.distance,
                member.report.address_text.as_deref().unwrap_or("(no address)")
            );
        }
        println!();
    }

    println!(
        "{} clusters, {} of {} reports assigned (threshold {}, window {} days)",
        response.stats.clusters_found,
        response.stats.processed_reports,
        response.stats.total_reports,
        response.stats.similarity_threshold,
        response.stats.time_period_days
    );

    Ok(())
}
