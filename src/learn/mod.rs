//! Preference-learning pipeline: population normalization stats, the weight
//! vector, and the online pairwise learner that updates it per vote.

pub mod learner;
pub mod normalize;
pub mod weights;

pub use learner::PairwiseLearner;
pub use normalize::FeatureStats;
pub use weights::WeightVector;
