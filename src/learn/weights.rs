//! # Weight Vector
//! Linear model coefficients over the fixed feature schema, plus the
//! neighborhood bonus map learned at half rate.
//!
//! Owned exclusively by the pairwise learner; everything else reads cloned
//! snapshots. The version counter increases once per applied comparison and
//! once per reset, so readers can tell whether two snapshots differ.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::listing::{Feature, FEATURE_SCHEMA_VERSION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    /// Schema generation these weights are defined over.
    pub schema_version: u32,
    /// Bumped on every mutation.
    pub version: u64,
    features: HashMap<Feature, f64>,
    neighborhoods: HashMap<String, f64>,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            schema_version: FEATURE_SCHEMA_VERSION,
            version: 0,
            features: HashMap::new(),
            neighborhoods: HashMap::new(),
        }
    }
}

impl WeightVector {
    pub fn feature(&self, f: Feature) -> f64 {
        self.features.get(&f).copied().unwrap_or(0.0)
    }

    pub fn neighborhood(&self, name: &str) -> f64 {
        self.neighborhoods.get(name).copied().unwrap_or(0.0)
    }

    pub fn nudge_feature(&mut self, f: Feature, delta: f64) {
        *self.features.entry(f).or_insert(0.0) += delta;
    }

    pub fn nudge_neighborhood(&mut self, name: &str, delta: f64) {
        *self.neighborhoods.entry(name.to_string()).or_insert(0.0) += delta;
    }

    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// All schema features with their current weight, sorted by |weight|
    /// descending (zero-weight features included so the insight surface is
    /// stable across refreshes). Equal magnitudes fall back to schema order.
    pub fn ranked_features(&self) -> Vec<(Feature, f64)> {
        let mut out: Vec<(Feature, f64)> =
            Feature::ALL.iter().map(|&f| (f, self.feature(f))).collect();
        out.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }

    /// Drop back to the zero prior. Keeps counting versions so a reset is
    /// observable to snapshot readers.
    pub fn reset(&mut self) {
        self.features.clear();
        self.neighborhoods.clear();
        self.version += 1;
    }

    pub fn is_neutral(&self) -> bool {
        self.features.values().all(|w| *w == 0.0)
            && self.neighborhoods.values().all(|w| *w == 0.0)
    }
}
