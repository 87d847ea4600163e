//! Typed error taxonomy for the similarity and clustering engine.
//!
//! Operation-level failures (bad input, missing report, provider outage)
//! propagate as variants of [`Error`]. Row-level computational faults
//! (a corrupt vector, an out-of-range coordinate in one pair) are handled
//! where they occur: the offending row is logged and skipped so a single
//! bad record never aborts a multi-row operation.

use thiserror::Error;

/// All failures the engine can surface to a caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad caller input — user-visible message, 4xx-equivalent.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The requested report id does not exist.
    #[error("report {0} not found")]
    ReportNotFound(i64),

    /// The report exists but has no stored embedding to compare with.
    #[error("report {0} has no stored embedding")]
    NoEmbedding(i64),

    /// Two vectors of different dimension were compared.
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// A zero-magnitude vector cannot be normalized for cosine distance.
    #[error("cannot compute cosine distance against a zero-magnitude vector")]
    DegenerateVector,

    /// Latitude outside [-90, 90] or longitude outside [-180, 180].
    #[error("coordinate out of range: lat {lat}, lon {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    /// The external embedding provider failed or timed out.
    ///
    /// Retryable by the caller; the engine itself does not retry.
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Unexpected failure that fits no other variant.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
