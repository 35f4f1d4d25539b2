use crate::capture::structs::CaptureMetadata;
use crate::fallback::PipelineTrace;
use crate::geo::structs::{Coordinates, LocationResolution};
use crate::market::structs::{MarketSnapshot, PropertyListing};
use crate::synthesis::structs::{ComparableSummary, Recommendation};
use crate::vision::structs::VisualAnalysisResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An uploaded photograph. Owned by a single analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    name: String,
    media_type: String,
    bytes: Vec<u8>,
}

impl ImageAsset {
    /// * `name` - Display name, usually the uploaded file name. The local
    ///   fallback analysis reads room hints from it.
    /// * `media_type` - MIME type declared by the uploader. Not trusted for
    ///   format detection.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Inclusive numeric band, e.g. a price or area range.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Distance between the edges.
    #[must_use]
    pub fn width(&self) -> f64 {
        (self.max - self.min).abs()
    }
}

/// Caller-supplied knowledge about the property being appraised.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyContext {
    pub estimated_value: Option<f64>,
    pub property_type: Option<String>,
    pub price_range: Option<ValueRange>,
    pub area_range: Option<ValueRange>,
    /// Known position of the property. Enables the market search for photos
    /// without GPS tags.
    pub coordinates: Option<Coordinates>,
}

/// The single result of [`crate::PropertyAnalyzer::analyze`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub metadata: Option<CaptureMetadata>,
    pub location: Option<LocationResolution>,
    pub market_snapshot: Option<MarketSnapshot>,
    pub comparables: Vec<PropertyListing>,
    pub comparable_summary: Option<ComparableSummary>,
    pub visual_analysis: VisualAnalysisResult,
    pub contextual_analysis: String,
    pub recommendations: Vec<Recommendation>,
    pub success: bool,
    /// Set only when the asset could not be read as an image.
    pub error: Option<String>,
    pub processing_time_ms: u64,
    /// BLAKE3 hex digest of the payload.
    pub asset_fingerprint: String,
    pub trace: PipelineTrace,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_range() {
        let band = ValueRange::new(400_000.0, 600_000.0);
        assert_eq!(band.midpoint(), 500_000.0);
        assert_eq!(band.width(), 200_000.0);
        assert_eq!(ValueRange::new(600_000.0, 400_000.0).width(), 200_000.0);
    }

    #[test]
    fn test_context_deserializes_camel_case() {
        let context: PropertyContext = serde_json::from_str(
            r#"{"estimatedValue": 850000, "propertyType": "apartment",
                "priceRange": {"min": 700000, "max": 900000}}"#,
        )
        .unwrap();
        assert_eq!(context.estimated_value, Some(850_000.0));
        assert_eq!(context.property_type.as_deref(), Some("apartment"));
        assert!(context.area_range.is_none());
    }

    #[test]
    fn test_asset_size() {
        let asset = ImageAsset::new("sala.jpg", "image/jpeg", vec![0; 1024]);
        assert_eq!(asset.size(), 1024);
        assert_eq!(asset.name(), "sala.jpg");
    }
}
