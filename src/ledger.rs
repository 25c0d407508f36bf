//! # Comparison Ledger
//! Append-only log of pairwise vote outcomes.
//!
//! Records are immutable once committed; corrections are new records. The
//! only way to drop history is the administrative reset, which also resets
//! the learned weights so ledger and model never diverge.
//!
//! Appending is split into `stage` (allocate id + timestamp, validate) and
//! `commit` so the engine can complete the durable write in between. A
//! staged record that never commits leaves a gap in the id sequence; ids
//! are monotonic, not dense.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RankingError;

/// Outcome of a pairwise vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Winner {
    A,
    B,
    Tie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub id: u64,
    pub listing_a_id: u64,
    pub listing_b_id: u64,
    pub winner: Winner,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct Inner {
    records: Vec<ComparisonRecord>,
    next_id: u64,
}

#[derive(Debug)]
pub struct ComparisonLedger {
    inner: Mutex<Inner>,
}

impl Default for ComparisonLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ComparisonLedger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Build the next record without committing it. Rejects self-pairs;
    /// existence of both listing ids is the caller's check against the store.
    pub fn stage(
        &self,
        listing_a_id: u64,
        listing_b_id: u64,
        winner: Winner,
        user_id: &str,
    ) -> Result<ComparisonRecord, RankingError> {
        if listing_a_id == listing_b_id {
            return Err(RankingError::InvalidComparison(format!(
                "listing {listing_a_id} cannot be compared with itself"
            )));
        }
        let mut inner = self.inner.lock().expect("ledger mutex poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        Ok(ComparisonRecord {
            id,
            listing_a_id,
            listing_b_id,
            winner,
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Append a staged record after its durable write succeeded.
    pub fn commit(&self, record: ComparisonRecord) {
        let mut inner = self.inner.lock().expect("ledger mutex poisoned");
        inner.records.push(record);
    }

    /// Last `limit` records, newest first. Finite and restartable: each call
    /// walks a fresh copy of the committed tail.
    pub fn recent(&self, limit: usize) -> Vec<ComparisonRecord> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        inner.records.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        inner.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Administrative reset: drop all records. Id allocation keeps counting
    /// so record ids stay unique across resets.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("ledger mutex poisoned");
        inner.records.clear();
    }
}
