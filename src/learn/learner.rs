//! # Pairwise Learner
//! Online gradient updates from pairwise votes to the weight vector.
//!
//! Model: `score(listing) = dot(weights, z(listing)) + nb[neighborhood]`.
//! A win moves weights so the winner's implied score tends to exceed the
//! loser's (logistic pairwise loss); a tie applies a symmetric half-step
//! that shrinks the score gap without favoring either side. Neighborhood
//! bonuses move at half the feature rate.
//!
//! The learner never reads the ledger itself: the engine calls `ingest`
//! only after the durable ledger write committed, so learner state cannot
//! run ahead of recorded history.

use crate::learn::normalize::FeatureStats;
use crate::learn::weights::WeightVector;
use crate::ledger::Winner;
use crate::listing::{Feature, Listing};

/// Fraction of the feature-level step applied to neighborhood bonuses.
const NEIGHBORHOOD_RATE: f64 = 0.5;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone)]
pub struct PairwiseLearner {
    weights: WeightVector,
    learning_rate: f64,
    tie_rate: f64,
}

impl PairwiseLearner {
    pub fn new(learning_rate: f64, tie_rate: f64) -> Self {
        Self {
            weights: WeightVector::default(),
            learning_rate,
            tie_rate,
        }
    }

    /// Restore from a persisted weight vector (e.g. at boot).
    pub fn with_weights(weights: WeightVector, learning_rate: f64, tie_rate: f64) -> Self {
        Self {
            weights,
            learning_rate,
            tie_rate,
        }
    }

    /// Read-only snapshot of the current weights.
    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    /// Model output for one listing under the given normalization stats.
    pub fn score(&self, listing: &Listing, stats: &FeatureStats) -> f64 {
        let mut score = 0.0;
        for f in Feature::ALL {
            score += self.weights.feature(f) * stats.normalized(listing, f);
        }
        if let Some(nb) = listing.neighborhood.as_deref() {
            score += self.weights.neighborhood(nb);
        }
        score
    }

    /// Apply one committed comparison to the weight vector.
    pub fn ingest(&mut self, a: &Listing, b: &Listing, winner: Winner, stats: &FeatureStats) {
        match winner {
            Winner::A => self.apply_win(a, b, stats),
            Winner::B => self.apply_win(b, a, stats),
            Winner::Tie => self.apply_tie(a, b, stats),
        }
        self.weights.bump_version();
    }

    fn apply_win(&mut self, winner: &Listing, loser: &Listing, stats: &FeatureStats) {
        let p = sigmoid(self.score(winner, stats) - self.score(loser, stats));
        let step = self.learning_rate * (1.0 - p);

        for f in Feature::ALL {
            let dz = stats.normalized(winner, f) - stats.normalized(loser, f);
            if dz != 0.0 {
                self.weights.nudge_feature(f, step * dz);
            }
        }
        if let Some(nb) = winner.neighborhood.as_deref() {
            self.weights.nudge_neighborhood(nb, step * NEIGHBORHOOD_RATE);
        }
        if let Some(nb) = loser.neighborhood.as_deref() {
            self.weights.nudge_neighborhood(nb, -step * NEIGHBORHOOD_RATE);
        }
    }

    /// Symmetric pull toward `score(a) == score(b)`: a gradient step on the
    /// squared score gap. Ties never bias the vector toward either side.
    fn apply_tie(&mut self, a: &Listing, b: &Listing, stats: &FeatureStats) {
        let gap = self.score(a, stats) - self.score(b, stats);
        for f in Feature::ALL {
            let dz = stats.normalized(a, f) - stats.normalized(b, f);
            if dz != 0.0 {
                self.weights.nudge_feature(f, -self.tie_rate * gap * dz);
            }
        }
        let nb_step = self.tie_rate * gap * NEIGHBORHOOD_RATE;
        if let Some(nb) = a.neighborhood.as_deref() {
            self.weights.nudge_neighborhood(nb, -nb_step);
        }
        if let Some(nb) = b.neighborhood.as_deref() {
            self.weights.nudge_neighborhood(nb, nb_step);
        }
    }

    /// Back to the neutral state: zero weights, all scores equal. Valid with
    /// an empty ledger, so this cannot fail.
    pub fn reset(&mut self) {
        self.weights.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learn::normalize::FeatureStats;

    fn listing(id: u64, price: f64, beds: f64, neighborhood: &str) -> Listing {
        let mut l: Listing = serde_json::from_str(&format!(r#"{{"id": {id}}}"#)).unwrap();
        l.list_price = Some(price);
        l.beds = Some(beds);
        l.neighborhood = Some(neighborhood.to_string());
        l
    }

    fn two_listing_world() -> (Listing, Listing, FeatureStats) {
        let a = listing(101, 500_000.0, 3.0, "Northside");
        let b = listing(202, 600_000.0, 4.0, "Southside");
        let stats = FeatureStats::compute(&[a.clone(), b.clone()], 1);
        (a, b, stats)
    }

    #[test]
    fn winner_score_rises_above_loser() {
        let (a, b, stats) = two_listing_world();
        let mut learner = PairwiseLearner::new(0.05, 0.025);
        learner.ingest(&a, &b, Winner::A, &stats);
        assert!(learner.score(&a, &stats) > learner.score(&b, &stats));
    }

    #[test]
    fn repeated_votes_keep_widening_the_gap() {
        let (a, b, stats) = two_listing_world();
        let mut learner = PairwiseLearner::new(0.05, 0.025);
        let mut last_gap = 0.0;
        for _ in 0..20 {
            learner.ingest(&a, &b, Winner::A, &stats);
            let gap = learner.score(&a, &stats) - learner.score(&b, &stats);
            assert!(gap > last_gap);
            last_gap = gap;
        }
    }

    #[test]
    fn tie_shrinks_an_existing_gap_symmetrically() {
        let (a, b, stats) = two_listing_world();
        let mut learner = PairwiseLearner::new(0.05, 0.025);
        for _ in 0..10 {
            learner.ingest(&a, &b, Winner::A, &stats);
        }
        let gap_before = (learner.score(&a, &stats) - learner.score(&b, &stats)).abs();
        learner.ingest(&a, &b, Winner::Tie, &stats);
        let gap_after = (learner.score(&a, &stats) - learner.score(&b, &stats)).abs();
        assert!(gap_after < gap_before);
    }

    #[test]
    fn tie_on_neutral_weights_is_a_no_op_update() {
        let (a, b, stats) = two_listing_world();
        let mut learner = PairwiseLearner::new(0.05, 0.025);
        learner.ingest(&a, &b, Winner::Tie, &stats);
        // Gap is zero before the tie, so nothing moves.
        assert!(learner.weights().is_neutral());
        assert_eq!(learner.weights().version, 1);
    }

    #[test]
    fn neighborhood_bonus_moves_at_half_rate() {
        let (a, b, stats) = two_listing_world();
        let mut learner = PairwiseLearner::new(0.05, 0.025);
        learner.ingest(&a, &b, Winner::A, &stats);
        let w = learner.weights();
        assert!(w.neighborhood("Northside") > 0.0);
        assert!(w.neighborhood("Southside") < 0.0);
        // Winner had fewer beds, so beds learned negative.
        assert!(w.feature(Feature::Beds) < 0.0);
        assert!(
            w.neighborhood("Northside").abs() < w.feature(Feature::Beds).abs(),
            "neighborhood step must stay below the feature step"
        );
    }

    #[test]
    fn reset_returns_to_neutral() {
        let (a, b, stats) = two_listing_world();
        let mut learner = PairwiseLearner::new(0.05, 0.025);
        learner.ingest(&a, &b, Winner::B, &stats);
        learner.reset();
        assert!(learner.weights().is_neutral());
        assert_eq!(learner.score(&a, &stats), learner.score(&b, &stats));
    }
}
