//! # Listing Store
//! Read-mostly holder of property records, keyed by listing id.
//!
//! Records arrive from an external ingestion process (seed file at boot or
//! the admin endpoint) and are immutable to the engine; upserts replace the
//! whole record. Snapshots are returned id-ordered so downstream recomputes
//! are deterministic for identical inputs.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use crate::listing::Listing;

#[derive(Debug, Default)]
pub struct ListingStore {
    inner: RwLock<HashMap<u64, Listing>>,
}

impl ListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a seed population from a JSON array file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Vec<Listing>> {
        let bytes = fs::read(path).map_err(|e| {
            anyhow::anyhow!("failed to read listings file {}: {}", path.display(), e)
        })?;
        let listings: Vec<Listing> = serde_json::from_slice(&bytes).map_err(|e| {
            anyhow::anyhow!("failed to parse listings file {}: {}", path.display(), e)
        })?;
        Ok(listings)
    }

    /// Insert or replace records. Returns the number applied.
    pub fn upsert_many(&self, listings: Vec<Listing>) -> usize {
        let mut map = self.inner.write().expect("listing store lock poisoned");
        let n = listings.len();
        for l in listings {
            map.insert(l.id, l);
        }
        n
    }

    pub fn get(&self, id: u64) -> Option<Listing> {
        let map = self.inner.read().expect("listing store lock poisoned");
        map.get(&id).cloned()
    }

    pub fn contains(&self, id: u64) -> bool {
        let map = self.inner.read().expect("listing store lock poisoned");
        map.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        let map = self.inner.read().expect("listing store lock poisoned");
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stable, id-ordered copy of the current population.
    pub fn snapshot(&self) -> Vec<Listing> {
        let map = self.inner.read().expect("listing store lock poisoned");
        let mut out: Vec<Listing> = map.values().cloned().collect();
        out.sort_by_key(|l| l.id);
        out
    }
}
