//! # Durable Store
//! Write-through persistence seam for the ingest transaction.
//!
//! The engine writes durably first and commits to memory only afterwards,
//! so a failed write leaves in-memory state untouched and the caller can
//! retry. The storage technology is deliberately behind a trait: the file
//! store below is the reference implementation, not a commitment.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::PathBuf;

use crate::error::RankingError;
use crate::learn::WeightVector;
use crate::ledger::ComparisonRecord;

pub trait DurableStore: Send + Sync {
    /// Append one comparison to the durable log.
    fn append_comparison(&self, record: &ComparisonRecord) -> Result<(), RankingError>;

    /// Replace the persisted weight vector.
    fn save_weights(&self, weights: &WeightVector) -> Result<(), RankingError>;

    /// Weights from a previous run, if any.
    fn load_weights(&self) -> Result<Option<WeightVector>, RankingError>;

    /// Administrative reset: drop log and weights.
    fn clear(&self) -> Result<(), RankingError>;
}

/// In-memory-only deployments: every durable write trivially succeeds.
#[derive(Debug, Default)]
pub struct NullStore;

impl DurableStore for NullStore {
    fn append_comparison(&self, _record: &ComparisonRecord) -> Result<(), RankingError> {
        Ok(())
    }

    fn save_weights(&self, _weights: &WeightVector) -> Result<(), RankingError> {
        Ok(())
    }

    fn load_weights(&self) -> Result<Option<WeightVector>, RankingError> {
        Ok(None)
    }

    fn clear(&self) -> Result<(), RankingError> {
        Ok(())
    }
}

/// JSON-on-disk store: comparisons as an append-only JSONL log, the weight
/// vector as a single JSON document replaced atomically via rename.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: PathBuf) -> Result<Self, RankingError> {
        fs::create_dir_all(&dir).map_err(RankingError::persistence)?;
        Ok(Self { dir })
    }

    fn log_path(&self) -> PathBuf {
        self.dir.join("comparisons.jsonl")
    }

    fn weights_path(&self) -> PathBuf {
        self.dir.join("weights.json")
    }
}

impl DurableStore for JsonFileStore {
    fn append_comparison(&self, record: &ComparisonRecord) -> Result<(), RankingError> {
        let line = serde_json::to_string(record).map_err(RankingError::persistence)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())
            .map_err(RankingError::persistence)?;
        writeln!(file, "{line}").map_err(RankingError::persistence)?;
        Ok(())
    }

    fn save_weights(&self, weights: &WeightVector) -> Result<(), RankingError> {
        let json = serde_json::to_vec_pretty(weights).map_err(RankingError::persistence)?;
        let tmp = self.dir.join("weights.json.tmp");
        fs::write(&tmp, json).map_err(RankingError::persistence)?;
        fs::rename(&tmp, self.weights_path()).map_err(RankingError::persistence)?;
        Ok(())
    }

    fn load_weights(&self) -> Result<Option<WeightVector>, RankingError> {
        let path = self.weights_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(RankingError::persistence)?;
        let weights = serde_json::from_slice(&bytes).map_err(RankingError::persistence)?;
        Ok(Some(weights))
    }

    fn clear(&self) -> Result<(), RankingError> {
        for path in [self.log_path(), self.weights_path()] {
            if path.exists() {
                fs::remove_file(&path).map_err(RankingError::persistence)?;
            }
        }
        Ok(())
    }
}
