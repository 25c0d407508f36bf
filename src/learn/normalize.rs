//! # Feature Normalization
//! Population z-score statistics for the fixed feature schema.
//!
//! Stats are recomputed periodically from the listing population (every N
//! ingests, plus at seed and reset), never per-vote, to keep gradient
//! updates stable. Each refresh carries a version so a persisted weight
//! vector can be matched to the stats it was trained against.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::listing::{Feature, Listing};

/// Standard deviations below this are treated as "constant feature":
/// normalization yields zero so the feature cannot dominate by noise.
const MIN_STD: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureMoments {
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub version: u64,
    moments: HashMap<Feature, FeatureMoments>,
}

impl FeatureStats {
    /// Compute population mean/std per feature. Listings missing a value for
    /// a feature are excluded from that feature's moments.
    pub fn compute(listings: &[Listing], version: u64) -> Self {
        let mut moments = HashMap::new();
        for f in Feature::ALL {
            let values: Vec<f64> = listings.iter().filter_map(|l| l.feature(f)).collect();
            if values.is_empty() {
                continue;
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            moments.insert(
                f,
                FeatureMoments {
                    mean,
                    std: var.sqrt(),
                },
            );
        }
        Self { version, moments }
    }

    pub fn moments(&self, f: Feature) -> Option<FeatureMoments> {
        self.moments.get(&f).copied()
    }

    /// Z-score of a listing's feature value. Missing values, features with
    /// no population data, and (near-)constant features all normalize to
    /// zero contribution.
    pub fn normalized(&self, listing: &Listing, f: Feature) -> f64 {
        let Some(raw) = listing.feature(f) else {
            return 0.0;
        };
        let Some(m) = self.moments.get(&f) else {
            return 0.0;
        };
        if m.std < MIN_STD {
            return 0.0;
        }
        (raw - m.mean) / m.std
    }
}
