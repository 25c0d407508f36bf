//! Engine error taxonomy.
//!
//! Validation errors are rejected before any mutation; persistence errors
//! abort the whole ingest with in-memory state unchanged. An empty candidate
//! set is NOT represented here: the sampler returns `Ok(None)` for it, since
//! "nothing to rank" is a valid result, not a failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RankingError {
    /// Malformed or self-referential vote, rejected before the ledger write.
    #[error("invalid comparison: {0}")]
    InvalidComparison(String),

    /// Reference to a listing id absent from the store.
    #[error("unknown listing id {0}")]
    UnknownListing(u64),

    /// Durable write failed; caller should retry. Memory was left unchanged.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl RankingError {
    pub fn persistence(e: impl std::fmt::Display) -> Self {
        RankingError::Persistence(e.to_string())
    }
}
