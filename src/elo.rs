//! # Head-to-Head Rating
//! Classic Elo update applied per vote, alongside the feature model.
//!
//! The feature learner generalizes preferences to never-compared listings;
//! the Elo rating tracks raw head-to-head performance of listings that
//! actually appeared in votes. Surfaced in ranking entries, never used for
//! candidate selection.

use crate::ledger::Winner;

/// Rating every listing starts from.
pub const INITIAL_RATING: f64 = 1000.0;

/// Maximum rating movement per game.
pub const K_FACTOR: f64 = 32.0;

/// Logistic scale: a 400-point gap means ~10:1 expected odds.
const SCALE: f64 = 400.0;

fn expected(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) / SCALE))
}

/// New `(rating_a, rating_b)` after one comparison.
pub fn update(rating_a: f64, rating_b: f64, winner: Winner) -> (f64, f64) {
    let expected_a = expected(rating_a, rating_b);
    let expected_b = expected(rating_b, rating_a);

    let (score_a, score_b) = match winner {
        Winner::A => (1.0, 0.0),
        Winner::B => (0.0, 1.0),
        Winner::Tie => (0.5, 0.5),
    };

    (
        rating_a + K_FACTOR * (score_a - expected_a),
        rating_b + K_FACTOR * (score_b - expected_b),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_match_win_moves_half_k() {
        let (a, b) = update(INITIAL_RATING, INITIAL_RATING, Winner::A);
        assert!((a - 1016.0).abs() < 1e-9);
        assert!((b - 984.0).abs() < 1e-9);
    }

    #[test]
    fn rating_is_conserved() {
        let (a, b) = update(1100.0, 900.0, Winner::B);
        assert!((a + b - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn tie_pulls_ratings_together() {
        let (a, b) = update(1200.0, 1000.0, Winner::Tie);
        assert!(a < 1200.0);
        assert!(b > 1000.0);
    }

    #[test]
    fn upset_wins_move_more_than_expected_wins() {
        let (fav_win, _) = update(1200.0, 1000.0, Winner::A);
        let (_, underdog_win) = update(1200.0, 1000.0, Winner::B);
        assert!((fav_win - 1200.0) < (underdog_win - 1000.0));
    }
}
