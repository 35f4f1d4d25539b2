//! Picks the best capture time and anchors it to UTC where possible.

use crate::capture::structs::{CaptureTimestamp, TimestampConfidence};
use crate::geo::structs::Coordinates;
use chrono::{
    DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use std::str::FromStr;
use tzf_rs::DefaultFinder;

static FINDER: std::sync::LazyLock<DefaultFinder> = std::sync::LazyLock::new(DefaultFinder::new);

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Raw time tags as read from the file.
#[derive(Debug, Default)]
pub struct TimeTags {
    /// `(tag name, value)` in priority order.
    pub naive_candidates: Vec<(&'static str, String)>,
    pub offset: Option<String>,
    pub gps_date: Option<String>,
    pub gps_time: Option<[f64; 3]>,
}

pub fn parse_exif_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim().trim_end_matches('\0');
    NaiveDateTime::parse_from_str(trimmed, EXIF_DATETIME_FORMAT).ok()
}

fn parse_offset(value: &str) -> Option<FixedOffset> {
    FixedOffset::from_str(value.trim().trim_end_matches('\0')).ok()
}

/// GPS date and time tags are always UTC.
fn parse_gps_utc(date: &str, time: [f64; 3]) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date.trim().trim_end_matches('\0'), "%Y:%m:%d").ok()?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let time = NaiveTime::from_hms_opt(time[0] as u32, time[1] as u32, time[2] as u32)?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

/// IANA timezone at a location.
pub fn timezone_at(coordinates: Coordinates) -> Option<Tz> {
    Tz::from_str(FINDER.get_tz_name(coordinates.longitude, coordinates.latitude)).ok()
}

pub fn resolve_timestamp(tags: TimeTags, location: Option<Coordinates>) -> Option<CaptureTimestamp> {
    let best_local = tags
        .naive_candidates
        .iter()
        .find_map(|(source, value)| parse_exif_datetime(value).map(|dt| (dt, *source)));
    let gps_utc = tags
        .gps_date
        .as_deref()
        .zip(tags.gps_time)
        .and_then(|(date, time)| parse_gps_utc(date, time));

    let Some((local, source)) = best_local else {
        // Only the GPS clock is known: UTC is exact, local time follows the location.
        let utc = gps_utc?;
        let (local, timezone) = match location.and_then(timezone_at) {
            Some(tz) => (utc.with_timezone(&tz).naive_local(), tz.name().to_string()),
            None => (utc.naive_utc(), "UTC".to_string()),
        };
        return Some(CaptureTimestamp {
            local,
            utc: Some(utc),
            timezone: Some(timezone),
            source: "GPSDateStamp".to_string(),
            confidence: TimestampConfidence::Medium,
        });
    };

    // --- Explicit offset tag ---
    if let Some(offset_str) = tags.offset.as_deref()
        && let Some(offset) = parse_offset(offset_str)
        && let LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) =
            offset.from_local_datetime(&local)
    {
        return Some(CaptureTimestamp {
            local,
            utc: Some(dt.with_timezone(&Utc)),
            timezone: Some(offset.to_string()),
            source: source.to_string(),
            confidence: TimestampConfidence::High,
        });
    }

    // --- Timezone from the GPS position ---
    if let Some(tz) = location.and_then(timezone_at)
        && let LocalResult::Single(zoned) | LocalResult::Ambiguous(zoned, _) =
            tz.from_local_datetime(&local)
    {
        return Some(CaptureTimestamp {
            local,
            utc: Some(zoned.with_timezone(&Utc)),
            timezone: Some(tz.name().to_string()),
            source: source.to_string(),
            confidence: TimestampConfidence::High,
        });
    }

    // --- Unconfirmed UTC from the GPS clock ---
    if let Some(utc) = gps_utc {
        let offset = local.signed_duration_since(utc.naive_utc());
        let minutes = i32::try_from(offset.num_minutes()).unwrap_or(0);
        return Some(CaptureTimestamp {
            local,
            utc: Some(utc),
            timezone: FixedOffset::east_opt(minutes * 60).map(|o| o.to_string()),
            source: format!("{source} + GPSDateStamp"),
            confidence: TimestampConfidence::Medium,
        });
    }

    Some(CaptureTimestamp {
        local,
        utc: None,
        timezone: None,
        source: source.to_string(),
        confidence: TimestampConfidence::Low,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn tags(naive: &str) -> TimeTags {
        TimeTags {
            naive_candidates: vec![("DateTimeOriginal", naive.to_string())],
            ..TimeTags::default()
        }
    }

    #[test]
    fn test_explicit_offset_wins() {
        let mut t = tags("2024:03:10 14:30:00");
        t.offset = Some("-03:00".to_string());

        let ts = resolve_timestamp(t, None).unwrap();

        assert_eq!(ts.confidence, TimestampConfidence::High);
        assert_eq!(ts.timezone.as_deref(), Some("-03:00"));
        assert_eq!(ts.utc.unwrap().hour(), 17);
    }

    #[test]
    fn test_timezone_from_location() {
        let ts = resolve_timestamp(
            tags("2024:03:10 14:30:00"),
            Some(Coordinates::new(-23.561, -46.656)),
        )
        .unwrap();

        assert_eq!(ts.timezone.as_deref(), Some("America/Sao_Paulo"));
        assert_eq!(ts.confidence, TimestampConfidence::High);
        // Brazil has no DST since 2019.
        assert_eq!(ts.utc.unwrap().hour(), 17);
    }

    #[test]
    fn test_naive_only_is_low_confidence() {
        let ts = resolve_timestamp(tags("2024:03:10 14:30:00"), None).unwrap();
        assert_eq!(ts.confidence, TimestampConfidence::Low);
        assert!(ts.utc.is_none());
        assert_eq!(ts.source, "DateTimeOriginal");
    }

    #[test]
    fn test_skips_unparseable_candidates() {
        let t = TimeTags {
            naive_candidates: vec![
                ("DateTimeOriginal", "0000:00:00 00:00:00".to_string()),
                ("DateTime", "2023:12:01 08:00:00".to_string()),
            ],
            ..TimeTags::default()
        };
        let ts = resolve_timestamp(t, None).unwrap();
        assert_eq!(ts.source, "DateTime");
    }

    #[test]
    fn test_gps_clock_only() {
        let t = TimeTags {
            gps_date: Some("2024:03:10".to_string()),
            gps_time: Some([17.0, 30.0, 0.0]),
            ..TimeTags::default()
        };
        let ts = resolve_timestamp(t, Some(Coordinates::new(-23.561, -46.656))).unwrap();
        assert_eq!(ts.confidence, TimestampConfidence::Medium);
        assert_eq!(ts.local.hour(), 14);
    }

    #[test]
    fn test_nothing_to_resolve() {
        assert!(resolve_timestamp(TimeTags::default(), None).is_none());
    }
}
