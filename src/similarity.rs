//! Cosine-distance similarity engine.
//!
//! Score direction used across the whole crate: **cosine distance**,
//! `1 − (a·b)/(‖a‖·‖b‖)`. 0 = identical direction, 2 = opposite; every
//! ranked surface sorts ascending, most similar first. Caller-facing
//! similarity thresholds in `(0, 1]` convert to this space via
//! [`distance_cutoff`].
//!
//! Pure functions over inputs; no I/O.

use tracing::warn;

use crate::error::{Error, Result};

/// Hard cap on ranked result sizes, bounding response payloads.
pub const MAX_RESULT_LIMIT: i64 = 50;

/// Compute cosine distance between two embedding vectors.
///
/// Accumulates in `f64` so long vectors of small components don't lose
/// precision.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if the vectors differ in length —
///   mismatched vectors never produce a numeric score.
/// - [`Error::DegenerateVector`] if either vector has zero magnitude.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        return Err(Error::DegenerateVector);
    }

    Ok(1.0 - dot / denom)
}

/// Convert a similarity threshold in `(0, 1]` into a distance cutoff.
///
/// A candidate matches when its cosine distance is ≤ the cutoff.
pub fn distance_cutoff(similarity_threshold: f64) -> f64 {
    1.0 - similarity_threshold
}

/// Clamp a caller-supplied result limit into `[1, MAX_RESULT_LIMIT]`.
pub fn clamp_limit(limit: i64) -> usize {
    limit.clamp(1, MAX_RESULT_LIMIT) as usize
}

/// Rank candidates by cosine distance to a query vector, ascending.
///
/// Ties keep candidate insertion order (stable sort), so equal-distance
/// results are deterministic. At most [`clamp_limit`]`(limit)` entries are
/// returned. A candidate whose distance cannot be computed (mismatched or
/// degenerate vector — corrupt data) is logged and skipped rather than
/// aborting the ranking.
pub fn rank(query: &[f32], candidates: &[(i64, &[f32])], limit: i64) -> Vec<(i64, f64)> {
    let mut scored: Vec<(i64, f64)> = Vec::with_capacity(candidates.len());

    for (id, vector) in candidates {
        match cosine_distance(query, vector) {
            Ok(distance) => scored.push((*id, distance)),
            Err(e) => {
                warn!(report_id = id, error = %e, "skipping unrankable candidate");
            }
        }
    }

    // Stable sort: equal distances keep insertion order.
    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(clamp_limit(limit));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identical_is_zero() {
        let v = vec![1.0, 2.0, 3.0];
        let d = cosine_distance(&v, &v).unwrap();
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn test_distance_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let d = cosine_distance(&a, &b).unwrap();
        assert!((d - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_opposite_is_two() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        let d = cosine_distance(&a, &b).unwrap();
        assert!((d - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = vec![0.3, -1.2, 4.5, 0.01];
        let b = vec![2.0, 0.4, -0.7, 1.5];
        let ab = cosine_distance(&a, &b).unwrap();
        let ba = cosine_distance(&b, &a).unwrap();
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_mismatch_never_scores() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        match cosine_distance(&a, &b) {
            Err(Error::DimensionMismatch { left, right }) => {
                assert_eq!((left, right), (2, 3));
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_vector_is_degenerate() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 3.0];
        assert!(matches!(
            cosine_distance(&a, &b),
            Err(Error::DegenerateVector)
        ));
        assert!(matches!(
            cosine_distance(&b, &a),
            Err(Error::DegenerateVector)
        ));
    }

    #[test]
    fn test_rank_ascending_and_limited() {
        let query = vec![1.0, 0.0];
        let far = vec![-1.0, 0.0];
        let near = vec![1.0, 0.1];
        let mid = vec![0.0, 1.0];
        let candidates: Vec<(i64, &[f32])> = vec![(1, &far[..]), (2, &near[..]), (3, &mid[..])];

        let ranked = rank(&query, &candidates, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, 2);
        assert_eq!(ranked[1].0, 3);
        assert!(ranked[0].1 <= ranked[1].1);
    }

    #[test]
    fn test_rank_stable_on_ties() {
        let query = vec![1.0, 0.0];
        let same = vec![2.0, 0.0]; // distance 0 regardless of magnitude
        let candidates: Vec<(i64, &[f32])> =
            vec![(30, &same[..]), (10, &same[..]), (20, &same[..])];

        let ranked = rank(&query, &candidates, 10);
        let ids: Vec<i64> = ranked.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![30, 10, 20], "ties must keep insertion order");
    }

    #[test]
    fn test_rank_skips_bad_rows() {
        let query = vec![1.0, 0.0];
        let good = vec![1.0, 0.2];
        let mismatched = vec![1.0, 0.0, 0.0];
        let zero = vec![0.0, 0.0];
        let candidates: Vec<(i64, &[f32])> =
            vec![(1, &mismatched[..]), (2, &good[..]), (3, &zero[..])];

        let ranked = rank(&query, &candidates, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0, 2);
    }

    #[test]
    fn test_limit_clamped_to_hard_maximum() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-5), 1);
        assert_eq!(clamp_limit(10), 10);
        assert_eq!(clamp_limit(500), MAX_RESULT_LIMIT as usize);
    }

    #[test]
    fn test_cutoff_conversion() {
        assert!((distance_cutoff(0.8) - 0.2).abs() < 1e-12);
        assert!((distance_cutoff(1.0)).abs() < 1e-12);
    }
}
