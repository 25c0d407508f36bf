//! # Ranking Index
//! Derived per-listing scores and percentiles, plus histogram queries.
//!
//! The table is a pure function of (listing population, weights, stats,
//! ratings, comparison counts): recomputes build a fresh ordered table
//! instead of mutating the previous one, so concurrent readers keep a
//! consistent snapshot.

use std::collections::HashMap;

use serde::Serialize;

use crate::elo;
use crate::learn::{FeatureStats, PairwiseLearner};
use crate::listing::Listing;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub listing_id: u64,
    /// Model output under the current weight vector.
    pub score: f64,
    /// Rank position within the population, 0-100. Equal scores share the
    /// percentile of their first occurrence in score order.
    pub percentile: f64,
    /// Head-to-head Elo rating.
    pub rating: f64,
    pub comparison_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionBin {
    pub lower_bound: f64,
    pub count: u64,
}

/// Immutable, ordered ranking projection. Entries are sorted by score
/// descending, ties broken by listing id ascending for determinism.
#[derive(Debug, Clone, Default)]
pub struct RankingTable {
    entries: Vec<RankingEntry>,
    by_id: HashMap<u64, usize>,
}

impl RankingTable {
    /// Build the full table. O(n log n): one score pass, one sort.
    pub fn compute(
        listings: &[Listing],
        learner: &PairwiseLearner,
        stats: &FeatureStats,
        ratings: &HashMap<u64, f64>,
        counts: &HashMap<u64, u64>,
    ) -> Self {
        let mut scored: Vec<(u64, f64)> = listings
            .iter()
            .map(|l| (l.id, learner.score(l, stats)))
            .collect();
        // Ascending by (score, id): percentile = share of population
        // strictly below, read off the first occurrence of each score run.
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let n = scored.len();
        let denom = n.saturating_sub(1).max(1) as f64;
        let mut entries: Vec<RankingEntry> = Vec::with_capacity(n);
        let mut run_start = 0usize;
        for (i, &(id, score)) in scored.iter().enumerate() {
            if i > 0 && score != scored[i - 1].1 {
                run_start = i;
            }
            entries.push(RankingEntry {
                listing_id: id,
                score,
                percentile: 100.0 * run_start as f64 / denom,
                rating: ratings.get(&id).copied().unwrap_or(elo::INITIAL_RATING),
                comparison_count: counts.get(&id).copied().unwrap_or(0),
            });
        }

        // Present best-first.
        entries.reverse();
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.listing_id, i))
            .collect();
        Self { entries, by_id }
    }

    /// Entries, best first.
    pub fn entries(&self) -> &[RankingEntry] {
        &self.entries
    }

    pub fn get(&self, listing_id: u64) -> Option<&RankingEntry> {
        self.by_id.get(&listing_id).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self, limit: usize) -> &[RankingEntry] {
        &self.entries[..limit.min(self.entries.len())]
    }

    /// Mean score of the current population; zero when empty.
    pub fn mean_score(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.entries.iter().map(|e| e.score).sum::<f64>() / self.entries.len() as f64
    }

    /// Histogram over the observed score range: exactly `bin_count` bins of
    /// `(lower_bound, count)`. An empty population yields `bin_count` empty
    /// bins; a zero score span puts all mass in the first bin.
    pub fn distribution(&self, bin_count: usize) -> Vec<DistributionBin> {
        if bin_count == 0 {
            return Vec::new();
        }

        let (min, span) = match (
            self.entries.iter().map(|e| e.score).fold(f64::INFINITY, f64::min),
            self.entries.iter().map(|e| e.score).fold(f64::NEG_INFINITY, f64::max),
        ) {
            (min, max) if min.is_finite() && max > min => (min, max - min),
            (min, _) if min.is_finite() => (min, 0.0),
            _ => (0.0, 0.0),
        };
        let width = if span > 0.0 { span / bin_count as f64 } else { 1.0 };

        let mut bins: Vec<DistributionBin> = (0..bin_count)
            .map(|i| DistributionBin {
                lower_bound: min + i as f64 * width,
                count: 0,
            })
            .collect();

        for e in &self.entries {
            let idx = (((e.score - min) / width).floor() as usize).min(bin_count - 1);
            bins[idx].count += 1;
        }

        bins
    }
}
