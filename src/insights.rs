//! # Insights Reporter
//! Human-readable summaries derived from the weight vector and the current
//! listing snapshot. Pure functions, no hidden state: the same inputs always
//! produce the same report.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::InsightsConfig;
use crate::learn::{FeatureStats, WeightVector};
use crate::listing::{Feature, Listing};
use crate::rank::RankingTable;

/// Weights below this magnitude are noise, not signal; they never produce a
/// budget cap.
const WEIGHT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborhoodInsight {
    pub neighborhood: String,
    pub mean_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Insights {
    /// `(feature, weight)` ranked by |weight| descending.
    pub weights: Vec<(String, f64)>,
    pub top_neighborhoods: Vec<NeighborhoodInsight>,
    /// Price where the price feature's score contribution flips negative.
    /// Absent whenever the model has not learned a price aversion; never a
    /// fabricated number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_cap: Option<f64>,
}

pub fn report(
    listings: &[Listing],
    table: &RankingTable,
    weights: &WeightVector,
    stats: &FeatureStats,
    config: &InsightsConfig,
) -> Insights {
    Insights {
        weights: ranked_weights(weights),
        top_neighborhoods: top_neighborhoods(listings, table, config),
        budget_cap: budget_cap(weights, stats),
    }
}

fn ranked_weights(weights: &WeightVector) -> Vec<(String, f64)> {
    weights
        .ranked_features()
        .into_iter()
        .map(|(f, w)| (f.name().to_string(), w))
        .collect()
}

/// Neighborhoods whose mean score inside the top percentile band beats the
/// population mean, best first, capped at the configured count.
fn top_neighborhoods(
    listings: &[Listing],
    table: &RankingTable,
    config: &InsightsConfig,
) -> Vec<NeighborhoodInsight> {
    let population_mean = table.mean_score();
    let neighborhood_of: HashMap<u64, &str> = listings
        .iter()
        .filter_map(|l| l.neighborhood.as_deref().map(|n| (l.id, n)))
        .collect();

    let mut sums: HashMap<&str, (f64, u64)> = HashMap::new();
    for e in table.entries() {
        if e.percentile < config.top_band_percentile {
            continue;
        }
        if let Some(&nb) = neighborhood_of.get(&e.listing_id) {
            let slot = sums.entry(nb).or_insert((0.0, 0));
            slot.0 += e.score;
            slot.1 += 1;
        }
    }

    let mut out: Vec<NeighborhoodInsight> = sums
        .into_iter()
        .map(|(nb, (sum, n))| NeighborhoodInsight {
            neighborhood: nb.to_string(),
            mean_score: sum / n as f64,
        })
        .filter(|ni| ni.mean_score > population_mean)
        .collect();
    out.sort_by(|a, b| {
        b.mean_score
            .partial_cmp(&a.mean_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.neighborhood.cmp(&b.neighborhood))
    });
    out.truncate(config.max_neighborhoods);
    out
}

/// Under a linear model over z-scored prices, the price contribution
/// `w * (price - mean) / std` turns from positive to negative exactly at the
/// population mean price, and only when the learned price weight is
/// negative. Otherwise there is no cap to report.
fn budget_cap(weights: &WeightVector, stats: &FeatureStats) -> Option<f64> {
    let w = weights.feature(Feature::ListPrice);
    if w >= -WEIGHT_EPSILON {
        return None;
    }
    stats.moments(Feature::ListPrice).map(|m| m.mean)
}
