//! The human-readable contextual report. One section per available input.

use crate::capture::structs::{CaptureMetadata, Equipment, TechnicalSettings};
use crate::geo::structs::LocationResolution;
use crate::market::structs::{MarketSnapshot, Stats, TrendDirection};
use crate::synthesis::structs::{ComparableSummary, TimeOfDay};
use crate::synthesis::sun::sun_info;
use crate::vision::structs::VisualAnalysisResult;
use chrono::{DateTime, Timelike, Utc};
use std::fmt::Write as _;

pub(crate) fn location_section(location: &LocationResolution) -> String {
    let mut out = String::from("## Location\n");
    if location.degraded {
        let _ = writeln!(
            out,
            "The address could not be resolved. Raw coordinates: {}.",
            location.formatted_address
        );
        return out;
    }

    let _ = writeln!(out, "Address: {}", location.formatted_address);
    let c = &location.components;
    let parts: Vec<String> = [
        ("Neighborhood", &c.neighborhood),
        ("City", &c.city),
        ("State", &c.state),
        ("Postal code", &c.postal_code),
        ("Country", &c.country),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.as_ref().map(|v| format!("{label}: {v}")))
    .collect();
    if !parts.is_empty() {
        let _ = writeln!(out, "{}", parts.join(" | "));
    }
    if !location.nearby_places.is_empty() {
        let _ = writeln!(out, "Nearby: {}", location.nearby_places.join(", "));
    }
    let _ = writeln!(
        out,
        "Resolved by {} ({:.0}% confidence, {} accuracy).",
        location.provider,
        location.confidence * 100.0,
        location.accuracy.label()
    );
    if !location.alternatives.is_empty() {
        let _ = writeln!(
            out,
            "{} alternative address(es) were reported by other providers.",
            location.alternatives.len()
        );
    }
    out
}

fn equipment_line(equipment: Option<&Equipment>, settings: Option<&TechnicalSettings>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(e) = equipment {
        match (&e.make, &e.model) {
            (Some(make), Some(model)) if model.starts_with(make.as_str()) => parts.push(model.clone()),
            (Some(make), Some(model)) => parts.push(format!("{make} {model}")),
            (None, Some(only)) | (Some(only), None) => parts.push(only.clone()),
            (None, None) => {}
        }
        if let Some(lens) = &e.lens {
            parts.push(format!("lens {lens}"));
        }
    }
    if let Some(s) = settings {
        if let Some(iso) = s.iso {
            parts.push(format!("ISO {iso}"));
        }
        if let Some(aperture) = s.aperture {
            parts.push(format!("f/{aperture:.1}"));
        }
        if let Some(shutter) = s.shutter_speed.filter(|s| *s > 0.0) {
            if shutter < 1.0 {
                parts.push(format!("1/{:.0} s", 1.0 / shutter));
            } else {
                parts.push(format!("{shutter:.1} s"));
            }
        }
        if let Some(focal) = s.focal_length {
            parts.push(format!("{focal:.0} mm"));
        }
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Date, time-of-day bucket, age, daylight and equipment. `None` without a
/// capture timestamp.
pub(crate) fn capture_section(metadata: &CaptureMetadata, now: DateTime<Utc>) -> Option<String> {
    let ts = metadata.capture_timestamp.as_ref()?;
    let mut out = String::from("## Capture\n");

    let bucket = TimeOfDay::from_hour(ts.local.hour());
    let age_days = (now.date_naive() - ts.local.date()).num_days().max(0);
    let _ = write!(
        out,
        "Taken on {} at {} ({}), {age_days} day(s) ago",
        ts.local.format("%Y-%m-%d"),
        ts.local.format("%H:%M"),
        bucket.label(),
    );
    if let Some(tz) = &ts.timezone {
        let _ = write!(out, ", timezone {tz}");
    }
    out.push_str(".\n");

    if let (Some(utc), Some(location)) = (ts.utc, metadata.location.as_ref())
        && let Some(sun) = sun_info(utc, location.coordinates())
    {
        let _ = writeln!(
            out,
            "Natural light: {} (sunrise {} UTC, sunset {} UTC).",
            if sun.is_daytime { "daylight" } else { "after dark" },
            sun.sunrise.format("%H:%M"),
            sun.sunset.format("%H:%M"),
        );
    }

    if let Some(line) = equipment_line(
        metadata.equipment.as_ref(),
        metadata.technical_settings.as_ref(),
    ) {
        let _ = writeln!(out, "Equipment: {line}.");
    }
    Some(out)
}

fn stats_line(out: &mut String, label: &str, stats: Option<&Stats>, unit: &str) {
    if let Some(s) = stats {
        let _ = writeln!(
            out,
            "{label}: average {:.0}{unit}, median {:.0}{unit}, range {:.0} to {:.0}{unit}.",
            s.average, s.median, s.min, s.max
        );
    }
}

pub(crate) fn market_section(snapshot: &MarketSnapshot) -> String {
    let mut out = String::from("## Market\n");
    let _ = writeln!(
        out,
        "{} properties found within {:.0} m.",
        snapshot.total_properties, snapshot.radius_m
    );
    stats_line(&mut out, "Price", snapshot.price.as_ref(), "");
    stats_line(&mut out, "Area", snapshot.area.as_ref(), " m²");
    stats_line(&mut out, "Price per m²", snapshot.price_per_area.as_ref(), "");
    if let Some(trend) = snapshot.trend {
        let direction = match trend.direction {
            TrendDirection::Rising => "rising",
            TrendDirection::Falling => "falling",
            TrendDirection::Stable => "stable",
        };
        let _ = writeln!(
            out,
            "Trend: {direction} ({:+.1}% price per m², recent listings against older ones).",
            trend.change_percent
        );
    }
    let sources: Vec<String> = snapshot
        .by_source
        .iter()
        .map(|(source, count)| format!("{source} {count}"))
        .collect();
    if !sources.is_empty() {
        let _ = writeln!(out, "Sources: {}.", sources.join(", "));
    }
    out
}

pub(crate) fn comparables_section(summary: &ComparableSummary, estimated_value: Option<f64>) -> String {
    let mut out = String::from("## Comparables\n");
    let _ = writeln!(
        out,
        "Top {} comparables: mean price {:.0}, mean area {:.0} m².",
        summary.count, summary.mean_price, summary.mean_area
    );
    if let (Some(estimated), Some(deviation)) = (estimated_value, summary.deviation_percent) {
        let relation = if deviation >= 0.0 { "above" } else { "below" };
        let _ = writeln!(
            out,
            "The estimated value of {estimated:.0} is {:.1}% {relation} the comparables mean.",
            deviation.abs()
        );
    }
    out
}

pub(crate) fn visual_section(visual: &VisualAnalysisResult) -> String {
    let mut out = String::from("## Visual analysis\n");
    let _ = writeln!(out, "{}", visual.analysis.trim_end());
    let _ = writeln!(
        out,
        "(provider: {}, confidence {:.0}%{})",
        visual.provider,
        visual.confidence * 100.0,
        if visual.degraded { ", degraded" } else { "" }
    );
    out
}
