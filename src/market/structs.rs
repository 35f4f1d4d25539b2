use crate::geo::structs::Coordinates;
use crate::structs::ValueRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A property offer used as market evidence.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyListing {
    pub id: String,
    pub title: String,
    pub price: f64,
    /// Square meters.
    pub area: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub coordinates: Coordinates,
    /// Name of the listing source that returned it.
    pub source: String,
    pub publish_date: DateTime<Utc>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    /// Meters from the search center. Filled in by ranking.
    #[serde(default)]
    pub distance_m: Option<f64>,
    /// 0-100. `None` until the listing has been ranked.
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

impl PropertyListing {
    #[must_use]
    pub fn price_per_area(&self) -> Option<f64> {
        (self.area > 0.0).then(|| self.price / self.area)
    }
}

/// What the comparables should look like.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub center: Coordinates,
    pub property_type: Option<String>,
    pub price_range: Option<ValueRange>,
    pub area_range: Option<ValueRange>,
    pub radius_m: f64,
}

impl SearchCriteria {
    #[must_use]
    pub const fn around(center: Coordinates, radius_m: f64) -> Self {
        Self {
            center,
            property_type: None,
            price_range: None,
            area_range: None,
            radius_m,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub median: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTrend {
    pub direction: TrendDirection,
    /// Change of the mean price per area, recent listings versus older ones.
    pub change_percent: f64,
}

/// Aggregates over every deduplicated listing in the search area.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub total_properties: usize,
    pub radius_m: f64,
    pub price: Option<Stats>,
    pub area: Option<Stats>,
    pub price_per_area: Option<Stats>,
    pub by_source: BTreeMap<String, usize>,
    pub by_property_type: BTreeMap<String, usize>,
    pub by_neighborhood: BTreeMap<String, usize>,
    pub trend: Option<MarketTrend>,
}

/// Output of one market search.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketResult {
    pub snapshot: MarketSnapshot,
    /// Ranked, best first, truncated to the configured count.
    pub comparables: Vec<PropertyListing>,
}
