//! # Listing Model
//! Property records and the fixed feature schema the learner operates on.
//!
//! Listings are created and updated by an external ingestion process; the
//! engine treats them as read-only except for its own derived projections
//! (score, percentile, comparison count) which live in the ranking table.

use serde::{Deserialize, Serialize};

/// Version of the feature schema the weight vector is defined over.
/// Bump when variants are added or removed so persisted weight vectors
/// from an older schema are not silently misread.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Fixed schema of numeric features known to the learner.
///
/// Every weight in the model resolves one of these names; a listing that
/// lacks a value for a feature contributes zero for it. Anything outside
/// this enum is rejected at store ingestion, never tolerated in the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    ListPrice,
    Sqft,
    Beds,
    FullBaths,
    HoaFee,
    Tax,
    YearBuilt,
    LotSqft,
    PricePerSqft,
}

impl Feature {
    pub const ALL: [Feature; 9] = [
        Feature::ListPrice,
        Feature::Sqft,
        Feature::Beds,
        Feature::FullBaths,
        Feature::HoaFee,
        Feature::Tax,
        Feature::YearBuilt,
        Feature::LotSqft,
        Feature::PricePerSqft,
    ];

    /// Stable wire name, matching the serde representation.
    pub fn name(&self) -> &'static str {
        match self {
            Feature::ListPrice => "list_price",
            Feature::Sqft => "sqft",
            Feature::Beds => "beds",
            Feature::FullBaths => "full_baths",
            Feature::HoaFee => "hoa_fee",
            Feature::Tax => "tax",
            Feature::YearBuilt => "year_built",
            Feature::LotSqft => "lot_sqft",
            Feature::PricePerSqft => "price_per_sqft",
        }
    }
}

/// A property record as the engine sees it.
///
/// `deny_unknown_fields` keeps the store honest: a payload carrying feature
/// names outside the schema fails at ingestion instead of surfacing as a
/// silently ignored column later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Listing {
    pub id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_photo: Option<String>,

    // Numeric features
    #[serde(default)]
    pub list_price: Option<f64>,
    #[serde(default)]
    pub sqft: Option<f64>,
    #[serde(default)]
    pub beds: Option<f64>,
    #[serde(default)]
    pub full_baths: Option<f64>,
    #[serde(default)]
    pub hoa_fee: Option<f64>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub year_built: Option<f64>,
    #[serde(default)]
    pub lot_sqft: Option<f64>,

    // Categorical
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    // Geo
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Listing {
    /// Derived price per square foot; undefined when sqft is zero or absent.
    pub fn price_per_sqft(&self) -> Option<f64> {
        match (self.list_price, self.sqft) {
            (Some(price), Some(sqft)) if sqft > 0.0 => Some(price / sqft),
            _ => None,
        }
    }

    /// Raw value for a schema feature. `None` means "no contribution",
    /// which normalization maps to zero.
    pub fn feature(&self, f: Feature) -> Option<f64> {
        match f {
            Feature::ListPrice => self.list_price,
            Feature::Sqft => self.sqft,
            Feature::Beds => self.beds,
            Feature::FullBaths => self.full_baths,
            Feature::HoaFee => self.hoa_fee,
            Feature::Tax => self.tax,
            Feature::YearBuilt => self.year_built,
            Feature::LotSqft => self.lot_sqft,
            Feature::PricePerSqft => self.price_per_sqft(),
        }
    }

    /// Flat Euclidean distance in degrees to another listing, if both carry
    /// coordinates. Good enough for "nearby candidates" filtering at city
    /// scale; not a geodesic.
    pub fn distance_to(&self, other: &Listing) -> Option<f64> {
        match (self.latitude, self.longitude, other.latitude, other.longitude) {
            (Some(lat_a), Some(lon_a), Some(lat_b), Some(lon_b)) => {
                let dlat = lat_a - lat_b;
                let dlon = lon_a - lon_b;
                Some((dlat * dlat + dlon * dlon).sqrt())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: u64) -> Listing {
        Listing {
            id,
            formatted_address: None,
            primary_photo: None,
            list_price: Some(500_000.0),
            sqft: Some(2_000.0),
            beds: Some(3.0),
            full_baths: Some(2.0),
            hoa_fee: None,
            tax: None,
            year_built: Some(1998.0),
            lot_sqft: None,
            neighborhood: Some("Northside".to_string()),
            style: None,
            latitude: Some(40.0),
            longitude: Some(-70.0),
        }
    }

    #[test]
    fn price_per_sqft_is_derived() {
        let l = listing(1);
        assert_eq!(l.price_per_sqft(), Some(250.0));
        assert_eq!(l.feature(Feature::PricePerSqft), Some(250.0));
    }

    #[test]
    fn price_per_sqft_undefined_for_zero_sqft() {
        let mut l = listing(1);
        l.sqft = Some(0.0);
        assert_eq!(l.price_per_sqft(), None);
        l.sqft = None;
        assert_eq!(l.price_per_sqft(), None);
    }

    #[test]
    fn missing_feature_reads_as_none() {
        let l = listing(1);
        assert_eq!(l.feature(Feature::HoaFee), None);
        assert_eq!(l.feature(Feature::Beds), Some(3.0));
    }

    #[test]
    fn unknown_fields_are_rejected_at_ingestion() {
        let raw = r#"{"id": 7, "list_price": 100.0, "walk_score": 93}"#;
        let parsed: Result<Listing, _> = serde_json::from_str(raw);
        assert!(parsed.is_err(), "unknown feature names must not deserialize");
    }

    #[test]
    fn distance_requires_coordinates_on_both_sides() {
        let a = listing(1);
        let mut b = listing(2);
        b.latitude = Some(43.0);
        b.longitude = Some(-66.0);
        let d = a.distance_to(&b).unwrap();
        assert!((d - 5.0).abs() < 1e-9);

        b.longitude = None;
        assert_eq!(a.distance_to(&b), None);
    }
}
