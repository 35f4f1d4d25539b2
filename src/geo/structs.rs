use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in signed decimal degrees (negative for south and west).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// In range, finite, and not the (0, 0) placeholder some cameras write
    /// when they have no fix.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && !(self.latitude == 0.0 && self.longitude == 0.0)
    }

    /// Snaps the point to a grid of `decimals` decimal places.
    /// Three decimals is roughly a 100 m cell.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn grid_cell(&self, decimals: i32) -> (i64, i64) {
        let scale = 10f64.powi(decimals);
        (
            (self.latitude * scale).round() as i64,
            (self.longitude * scale).round() as i64,
        )
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressComponents {
    pub street: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    VeryHigh,
    High,
    Medium,
    Low,
}

impl Accuracy {
    #[must_use]
    pub fn from_confidence(confidence: f64) -> Self {
        match confidence {
            c if c >= 0.9 => Self::VeryHigh,
            c if c >= 0.75 => Self::High,
            c if c >= 0.5 => Self::Medium,
            _ => Self::Low,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryHigh => "very high",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// One address a geocoding provider proposes for a coordinate, already
/// normalized away from the provider's own response shape.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeCandidate {
    pub formatted_address: String,
    pub components: AddressComponents,
    pub confidence: f64,
    pub nearby_places: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeLocation {
    pub provider: String,
    pub formatted_address: String,
    pub confidence: f64,
}

/// The best address found for a coordinate.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResolution {
    pub coordinates: Coordinates,
    pub formatted_address: String,
    pub components: AddressComponents,
    /// Name of the geocoding provider that answered.
    pub provider: String,
    /// Always `> 0` for a resolved location.
    pub confidence: f64,
    pub accuracy: Accuracy,
    pub nearby_places: Vec<String>,
    pub alternatives: Vec<AlternativeLocation>,
    /// `true` when no provider answered and only the raw coordinates are known.
    pub degraded: bool,
}
