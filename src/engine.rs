//! # Ranking Engine
//! Single-writer orchestration of store, ledger, learner and derived state.
//!
//! All mutation serializes through one writer lock held for the whole
//! `ingest + recompute` span; the learning update and the recompute are not
//! commutative with reads of a half-updated vector. Readers never wait on
//! the writer: they clone an `Arc` to the last fully-committed snapshot,
//! which is swapped in only after a completed recompute.
//!
//! Ingest transaction order, so no partial update survives a failure:
//!   validate -> stage record -> durable log write -> learn (on a scratch
//!   copy) -> durable weight write -> commit memory -> swap snapshot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use metrics::{counter, gauge};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::elo;
use crate::error::RankingError;
use crate::insights::{self, Insights};
use crate::learn::{FeatureStats, PairwiseLearner};
use crate::ledger::{ComparisonLedger, ComparisonRecord, Winner};
use crate::listing::Listing;
use crate::persist::DurableStore;
use crate::rank::{DistributionBin, RankingEntry, RankingTable};
use crate::sampler::{self, PairRequest};
use crate::store::ListingStore;

/// Last fully-committed state, shared read-only with all query paths.
#[derive(Debug, Clone, Default)]
pub struct RankingSnapshot {
    /// Equals the weight vector version that produced this snapshot.
    pub version: u64,
    pub weights: crate::learn::WeightVector,
    pub stats: FeatureStats,
    pub table: RankingTable,
}

/// Returned to the vote submitter: the committed record plus the snapshot
/// generation its effects are visible in.
#[derive(Debug, Clone)]
pub struct ComparisonReceipt {
    pub record: ComparisonRecord,
    pub snapshot_version: u64,
}

struct WriterState {
    learner: PairwiseLearner,
    stats: FeatureStats,
    ratings: HashMap<u64, f64>,
    counts: HashMap<u64, u64>,
    ingests_since_refresh: u64,
    stats_refreshes: u64,
}

pub struct RankingEngine {
    store: ListingStore,
    ledger: ComparisonLedger,
    writer: Mutex<WriterState>,
    snapshot: RwLock<Arc<RankingSnapshot>>,
    durable: Box<dyn DurableStore>,
    config: EngineConfig,
}

impl RankingEngine {
    pub fn new(config: EngineConfig, durable: Box<dyn DurableStore>) -> Self {
        let learning_rate = config.learning.learning_rate;
        let tie_rate = config.learning.tie_rate();

        let learner = match durable.load_weights() {
            Ok(Some(weights)) => {
                info!(version = weights.version, "restored persisted weight vector");
                PairwiseLearner::with_weights(weights, learning_rate, tie_rate)
            }
            Ok(None) => PairwiseLearner::new(learning_rate, tie_rate),
            Err(e) => {
                tracing::warn!(error = %e, "could not restore weights, starting neutral");
                PairwiseLearner::new(learning_rate, tie_rate)
            }
        };

        let engine = Self {
            store: ListingStore::new(),
            ledger: ComparisonLedger::new(),
            writer: Mutex::new(WriterState {
                learner,
                stats: FeatureStats::default(),
                ratings: HashMap::new(),
                counts: HashMap::new(),
                ingests_since_refresh: 0,
                stats_refreshes: 0,
            }),
            snapshot: RwLock::new(Arc::new(RankingSnapshot::default())),
            durable,
            config,
        };
        {
            let mut w = engine.writer.lock().expect("writer mutex poisoned");
            engine.commit(&mut w);
        }
        engine
    }

    /// Seed or extend the listing population. Refreshes normalization stats
    /// immediately so new listings score on current moments.
    pub fn seed_listings(&self, listings: Vec<Listing>) -> usize {
        let n = self.store.upsert_many(listings);
        let mut w = self.writer.lock().expect("writer mutex poisoned");
        self.refresh_stats(&mut w);
        self.commit(&mut w);
        gauge!("ranking_listing_population").set(self.store.len() as f64);
        info!(added = n, population = self.store.len(), "listing population updated");
        n
    }

    /// Submit one pairwise vote. On success the vote is durable, learned,
    /// and visible in the returned snapshot generation.
    pub fn submit_comparison(
        &self,
        listing_a_id: u64,
        listing_b_id: u64,
        winner: Winner,
        user_id: &str,
    ) -> Result<ComparisonReceipt, RankingError> {
        // Validation happens before any mutation.
        let listing_a = self
            .store
            .get(listing_a_id)
            .ok_or(RankingError::UnknownListing(listing_a_id))?;
        let listing_b = self
            .store
            .get(listing_b_id)
            .ok_or(RankingError::UnknownListing(listing_b_id))?;

        let mut w = self.writer.lock().expect("writer mutex poisoned");

        let record = self
            .ledger
            .stage(listing_a_id, listing_b_id, winner, user_id)?;
        self.durable.append_comparison(&record)?;

        // Learn on a scratch copy: the live learner only advances once the
        // weight write below has also succeeded.
        let mut scratch = w.learner.clone();
        let due_for_refresh =
            w.ingests_since_refresh + 1 >= self.config.learning.normalization_refresh_every;
        let stats = if due_for_refresh {
            FeatureStats::compute(&self.store.snapshot(), w.stats_refreshes + 1)
        } else {
            w.stats.clone()
        };
        scratch.ingest(&listing_a, &listing_b, winner, &stats);
        self.durable.save_weights(scratch.weights())?;

        // Commit: from here on nothing can fail.
        w.learner = scratch;
        if due_for_refresh {
            w.stats = stats;
            w.stats_refreshes += 1;
            w.ingests_since_refresh = 0;
        } else {
            w.ingests_since_refresh += 1;
        }

        let rating_a = w
            .ratings
            .get(&listing_a_id)
            .copied()
            .unwrap_or(elo::INITIAL_RATING);
        let rating_b = w
            .ratings
            .get(&listing_b_id)
            .copied()
            .unwrap_or(elo::INITIAL_RATING);
        let (new_a, new_b) = elo::update(rating_a, rating_b, winner);
        w.ratings.insert(listing_a_id, new_a);
        w.ratings.insert(listing_b_id, new_b);
        *w.counts.entry(listing_a_id).or_insert(0) += 1;
        *w.counts.entry(listing_b_id).or_insert(0) += 1;

        self.ledger.commit(record.clone());
        let version = self.commit(&mut w);

        counter!("ranking_comparisons_ingested_total").increment(1);
        debug!(
            record_id = record.id,
            snapshot_version = version,
            "comparison ingested"
        );

        Ok(ComparisonReceipt {
            record,
            snapshot_version: version,
        })
    }

    /// Next pair to present, honoring optional consideration-set filters.
    pub fn next_pair(
        &self,
        request: &PairRequest,
    ) -> Result<Option<(Listing, Listing)>, RankingError> {
        let snap = self.snapshot();
        let listings = self.store.snapshot();
        sampler::next_pair(&listings, &snap.table, &self.config.sampler, request)
    }

    pub fn distribution(&self, bin_count: usize) -> Vec<DistributionBin> {
        self.snapshot().table.distribution(bin_count)
    }

    pub fn insights(&self) -> Insights {
        let snap = self.snapshot();
        let listings = self.store.snapshot();
        insights::report(
            &listings,
            &snap.table,
            &snap.weights,
            &snap.stats,
            &self.config.insights,
        )
    }

    /// Best-ranked listings, best first.
    pub fn top(&self, limit: usize) -> Vec<RankingEntry> {
        self.snapshot().table.top(limit).to_vec()
    }

    pub fn recent_comparisons(&self, limit: usize) -> Vec<ComparisonRecord> {
        self.ledger.recent(limit)
    }

    /// Full administrative reset: ledger, weights, ratings, counts. The
    /// empty ledger is a valid state, so repeating a reset is a no-op.
    pub fn reset(&self) -> Result<(), RankingError> {
        let mut w = self.writer.lock().expect("writer mutex poisoned");
        self.durable.clear()?;
        self.ledger.clear();
        w.learner.reset();
        w.ratings.clear();
        w.counts.clear();
        self.refresh_stats(&mut w);
        let version = self.commit(&mut w);
        info!(snapshot_version = version, "engine reset to neutral state");
        Ok(())
    }

    /// Cheap handle to the last committed state.
    pub fn snapshot(&self) -> Arc<RankingSnapshot> {
        self.snapshot.read().expect("snapshot lock poisoned").clone()
    }

    pub fn listings(&self) -> Vec<Listing> {
        self.store.snapshot()
    }

    pub fn population(&self) -> usize {
        self.store.len()
    }

    fn refresh_stats(&self, w: &mut WriterState) {
        w.stats_refreshes += 1;
        w.stats = FeatureStats::compute(&self.store.snapshot(), w.stats_refreshes);
        w.ingests_since_refresh = 0;
    }

    /// Rebuild the derived table from committed writer state and publish it.
    fn commit(&self, w: &mut WriterState) -> u64 {
        let listings = self.store.snapshot();
        let table = RankingTable::compute(&listings, &w.learner, &w.stats, &w.ratings, &w.counts);
        let version = w.learner.weights().version;
        let snap = Arc::new(RankingSnapshot {
            version,
            weights: w.learner.weights().clone(),
            stats: w.stats.clone(),
            table,
        });
        *self.snapshot.write().expect("snapshot lock poisoned") = snap;
        gauge!("ranking_weight_version").set(version as f64);
        version
    }
}
