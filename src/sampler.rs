//! # Candidate Sampler
//! Chooses the next pair of listings to present for a vote.
//!
//! Priority order: listings starved of comparisons come first (exploration
//! floor), then partners are drawn from the closest-scoring candidates,
//! since near-ties are the most informative votes for a linear learner.
//! Uniform choice among the top candidates avoids serving the same pair on
//! every request.
//!
//! With an anchor listing the pool shrinks to the "consideration set":
//! listings within a distance radius and price ratio of the anchor. Too few
//! qualifiers is a valid empty result, never an error.

use rand::Rng;
use serde::Deserialize;

use crate::config::SamplerConfig;
use crate::error::RankingError;
use crate::listing::Listing;
use crate::rank::RankingTable;

/// Optional consideration-set constraints supplied by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PairRequest {
    pub anchor_listing_id: Option<u64>,
    /// Radius around the anchor, flat degrees.
    pub max_distance: Option<f64>,
    /// Price band around the anchor: candidate price within
    /// `[anchor / ratio, anchor * ratio]`.
    pub max_price_ratio: Option<f64>,
}

impl PairRequest {
    pub fn unconstrained() -> Self {
        Self::default()
    }
}

/// Select an unordered pair of distinct listings, or `None` when fewer than
/// two candidates qualify. An unknown anchor id is the only error path.
pub fn next_pair(
    listings: &[Listing],
    table: &RankingTable,
    config: &SamplerConfig,
    request: &PairRequest,
) -> Result<Option<(Listing, Listing)>, RankingError> {
    let pool = candidate_pool(listings, request)?;
    if pool.len() < 2 {
        return Ok(None);
    }

    let mut rng = rand::rng();

    // 1) Exploration floor: under-compared listings take the first slot.
    let under: Vec<&Listing> = pool
        .iter()
        .copied()
        .filter(|l| comparison_count(table, l.id) < config.min_comparisons)
        .collect();
    let first = if under.is_empty() {
        pool[rng.random_range(0..pool.len())]
    } else {
        under[rng.random_range(0..under.len())]
    };

    // 2) Informativeness: partner drawn uniformly from the top-K closest
    //    scores. Score gaps use the last committed snapshot.
    let first_score = score_of(table, first.id);
    let mut partners: Vec<(&Listing, f64)> = pool
        .iter()
        .copied()
        .filter(|l| l.id != first.id)
        .map(|l| (l, (score_of(table, l.id) - first_score).abs()))
        .collect();
    partners.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.id.cmp(&b.0.id))
    });
    partners.truncate(config.top_k.max(1));

    let second = partners[rng.random_range(0..partners.len())].0;
    Ok(Some((first.clone(), second.clone())))
}

/// Apply the consideration-set filter, if any. The anchor itself never
/// appears in its own candidate pool.
fn candidate_pool<'a>(
    listings: &'a [Listing],
    request: &PairRequest,
) -> Result<Vec<&'a Listing>, RankingError> {
    let Some(anchor_id) = request.anchor_listing_id else {
        return Ok(listings.iter().collect());
    };

    let anchor = listings
        .iter()
        .find(|l| l.id == anchor_id)
        .ok_or(RankingError::UnknownListing(anchor_id))?;

    let pool = listings
        .iter()
        .filter(|l| l.id != anchor_id)
        .filter(|l| within_distance(anchor, l, request.max_distance))
        .filter(|l| within_price_band(anchor, l, request.max_price_ratio))
        .collect();
    Ok(pool)
}

fn within_distance(anchor: &Listing, candidate: &Listing, max: Option<f64>) -> bool {
    let Some(max) = max else { return true };
    match anchor.distance_to(candidate) {
        Some(d) => d <= max,
        // No coordinates on either side: cannot qualify for a radius filter.
        None => false,
    }
}

fn within_price_band(anchor: &Listing, candidate: &Listing, ratio: Option<f64>) -> bool {
    let Some(ratio) = ratio else { return true };
    let (Some(anchor_price), Some(price)) = (anchor.list_price, candidate.list_price) else {
        return false;
    };
    if anchor_price <= 0.0 || ratio < 1.0 {
        return false;
    }
    price >= anchor_price / ratio && price <= anchor_price * ratio
}

fn score_of(table: &RankingTable, id: u64) -> f64 {
    table.get(id).map(|e| e.score).unwrap_or(0.0)
}

fn comparison_count(table: &RankingTable, id: u64) -> u64 {
    table.get(id).map(|e| e.comparison_count).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learn::{FeatureStats, PairwiseLearner};
    use std::collections::HashMap;

    fn listing(id: u64, price: f64, lat: f64, lon: f64) -> Listing {
        let mut l: Listing = serde_json::from_str(&format!(r#"{{"id": {id}}}"#)).unwrap();
        l.list_price = Some(price);
        l.latitude = Some(lat);
        l.longitude = Some(lon);
        l
    }

    fn table(listings: &[Listing], counts: &HashMap<u64, u64>) -> RankingTable {
        let stats = FeatureStats::compute(listings, 1);
        let learner = PairwiseLearner::new(0.05, 0.025);
        RankingTable::compute(listings, &learner, &stats, &HashMap::new(), counts)
    }

    fn config() -> SamplerConfig {
        SamplerConfig {
            min_comparisons: 3,
            top_k: 5,
        }
    }

    #[test]
    fn returns_distinct_listings() {
        let listings: Vec<Listing> =
            (1..=6).map(|i| listing(i, 100_000.0 * i as f64, 40.0, -70.0)).collect();
        let t = table(&listings, &HashMap::new());
        for _ in 0..50 {
            let (a, b) = next_pair(&listings, &t, &config(), &PairRequest::unconstrained())
                .unwrap()
                .expect("enough listings for a pair");
            assert_ne!(a.id, b.id);
        }
    }

    #[test]
    fn fewer_than_two_listings_is_an_empty_result_not_an_error() {
        let listings = vec![listing(1, 100_000.0, 40.0, -70.0)];
        let t = table(&listings, &HashMap::new());
        let pair = next_pair(&listings, &t, &config(), &PairRequest::unconstrained()).unwrap();
        assert!(pair.is_none());

        let none = next_pair(&[], &RankingTable::default(), &config(), &PairRequest::unconstrained())
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn under_compared_listings_take_the_first_slot() {
        let listings: Vec<Listing> =
            (1..=5).map(|i| listing(i, 500_000.0, 40.0, -70.0)).collect();
        // Everyone is saturated except listing 4.
        let mut counts: HashMap<u64, u64> = (1..=5).map(|i| (i, 10)).collect();
        counts.insert(4, 0);
        let t = table(&listings, &counts);

        for _ in 0..30 {
            let (a, b) = next_pair(&listings, &t, &config(), &PairRequest::unconstrained())
                .unwrap()
                .unwrap();
            assert!(
                a.id == 4 || b.id == 4,
                "the starved listing must appear in every pair while below the floor"
            );
        }
    }

    #[test]
    fn consideration_set_filters_by_distance_and_price() {
        let anchor = listing(1, 500_000.0, 40.0, -70.0);
        let near_similar = listing(2, 550_000.0, 40.01, -70.01);
        let near_expensive = listing(3, 2_000_000.0, 40.01, -70.0);
        let far_similar = listing(4, 500_000.0, 45.0, -60.0);
        let also_near = listing(5, 480_000.0, 39.99, -70.0);
        let listings = vec![anchor, near_similar, near_expensive, far_similar, also_near];
        let t = table(&listings, &HashMap::new());

        let req = PairRequest {
            anchor_listing_id: Some(1),
            max_distance: Some(0.5),
            max_price_ratio: Some(1.5),
        };
        for _ in 0..20 {
            let (a, b) = next_pair(&listings, &t, &config(), &req).unwrap().unwrap();
            for id in [a.id, b.id] {
                assert!(id == 2 || id == 5, "only the near, similarly-priced qualify");
            }
            assert_ne!(a.id, b.id);
        }
    }

    #[test]
    fn empty_consideration_set_is_a_valid_empty_result() {
        let listings = vec![
            listing(1, 500_000.0, 40.0, -70.0),
            listing(2, 5_000_000.0, 48.0, -60.0),
            listing(3, 4_000_000.0, 49.0, -61.0),
        ];
        let t = table(&listings, &HashMap::new());
        let req = PairRequest {
            anchor_listing_id: Some(1),
            max_distance: Some(0.1),
            max_price_ratio: Some(1.1),
        };
        assert!(next_pair(&listings, &t, &config(), &req).unwrap().is_none());
    }

    #[test]
    fn unknown_anchor_surfaces_an_error() {
        let listings = vec![listing(1, 500_000.0, 40.0, -70.0)];
        let t = table(&listings, &HashMap::new());
        let req = PairRequest {
            anchor_listing_id: Some(99),
            ..PairRequest::default()
        };
        let err = next_pair(&listings, &t, &config(), &req).unwrap_err();
        assert!(matches!(err, RankingError::UnknownListing(99)));
    }
}
