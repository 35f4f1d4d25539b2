use crate::geo::structs::Coordinates;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capture conditions embedded in an image. Every field is independently
/// optional; a photo without GPS is a normal photo.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMetadata {
    /// MIME type sniffed from the payload's magic bytes.
    pub media_type: Option<String>,
    pub location: Option<GpsLocation>,
    pub capture_timestamp: Option<CaptureTimestamp>,
    pub equipment: Option<Equipment>,
    pub technical_settings: Option<TechnicalSettings>,
}

impl CaptureMetadata {
    /// `true` when no embedded tag was found at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.capture_timestamp.is_none()
            && self.equipment.is_none()
            && self.technical_settings.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsLocation {
    /// Signed decimal degrees, negative for south.
    pub latitude: f64,
    /// Signed decimal degrees, negative for west.
    pub longitude: f64,
    /// Meters, negative below sea level.
    pub altitude: Option<f64>,
}

impl GpsLocation {
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampConfidence {
    /// Local time with an explicit offset or a timezone derived from GPS.
    High,
    /// UTC known, local wall-clock time inferred.
    Medium,
    /// Camera wall-clock time only.
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureTimestamp {
    /// Camera wall-clock time.
    pub local: NaiveDateTime,
    /// `None` when no offset or location was available to anchor `local`.
    pub utc: Option<DateTime<Utc>>,
    /// IANA name (e.g. "America/Sao_Paulo"), a fixed offset ("-03:00") or "UTC".
    pub timezone: Option<String>,
    /// The tag the time was read from.
    pub source: String,
    pub confidence: TimestampConfidence,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalSettings {
    pub iso: Option<u32>,
    /// f-number.
    pub aperture: Option<f64>,
    /// Exposure time in seconds.
    pub shutter_speed: Option<f64>,
    /// Millimeters, 35 mm equivalent when the camera reports it.
    pub focal_length: Option<f64>,
}
