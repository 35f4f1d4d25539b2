use crate::market::structs::{
    MarketSnapshot, MarketTrend, PropertyListing, SearchCriteria, Stats, TrendDirection,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Listings newer than this are compared against the rest for the trend.
const TREND_RECENT_DAYS: i64 = 15;
const TREND_MIN_PER_BUCKET: usize = 2;
/// Changes within this many percent count as stable.
const TREND_STABLE_BAND: f64 = 5.0;

const UNKNOWN: &str = "unknown";

/// Sorted-middle median; the mean of the two middle values for even counts.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

#[must_use]
pub fn stats(values: &[f64]) -> Option<Stats> {
    Some(Stats {
        min: values.iter().copied().reduce(f64::min)?,
        max: values.iter().copied().reduce(f64::max)?,
        average: mean(values)?,
        median: median(values)?,
    })
}

fn count_by<'a>(
    listings: &'a [PropertyListing],
    key: impl Fn(&'a PropertyListing) -> Option<&'a str>,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for listing in listings {
        let label = key(listing).unwrap_or(UNKNOWN);
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Compares the mean price per area of recent listings with older ones.
/// `None` when either side has too few listings to say anything.
#[must_use]
pub fn trend(listings: &[PropertyListing], now: DateTime<Utc>) -> Option<MarketTrend> {
    let cutoff = now - Duration::days(TREND_RECENT_DAYS);
    let (recent, older): (Vec<_>, Vec<_>) = listings
        .iter()
        .filter_map(|l| l.price_per_area().map(|ppa| (l.publish_date, ppa)))
        .partition(|(published, _)| *published >= cutoff);

    if recent.len() < TREND_MIN_PER_BUCKET || older.len() < TREND_MIN_PER_BUCKET {
        return None;
    }
    let recent_mean = mean(&recent.iter().map(|(_, v)| *v).collect::<Vec<_>>())?;
    let older_mean = mean(&older.iter().map(|(_, v)| *v).collect::<Vec<_>>())?;
    if older_mean <= 0.0 {
        return None;
    }

    let change_percent = (recent_mean - older_mean) / older_mean * 100.0;
    let direction = if change_percent > TREND_STABLE_BAND {
        TrendDirection::Rising
    } else if change_percent < -TREND_STABLE_BAND {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    };
    Some(MarketTrend {
        direction,
        change_percent,
    })
}

/// Aggregates over the full deduplicated set, not only the top comparables.
#[must_use]
pub fn snapshot(listings: &[PropertyListing], criteria: &SearchCriteria, now: DateTime<Utc>) -> MarketSnapshot {
    let prices: Vec<f64> = listings.iter().map(|l| l.price).collect();
    let areas: Vec<f64> = listings.iter().map(|l| l.area).filter(|a| *a > 0.0).collect();
    let price_per_area: Vec<f64> = listings.iter().filter_map(PropertyListing::price_per_area).collect();

    MarketSnapshot {
        total_properties: listings.len(),
        radius_m: criteria.radius_m,
        price: stats(&prices),
        area: stats(&areas),
        price_per_area: stats(&price_per_area),
        by_source: count_by(listings, |l| Some(l.source.as_str())),
        by_property_type: count_by(listings, |l| l.property_type.as_deref()),
        by_neighborhood: count_by(listings, |l| l.neighborhood.as_deref()),
        trend: trend(listings, now),
    }
}
