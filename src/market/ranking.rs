//! Weighted relevance scoring of comparable listings.

use crate::geo::distance::haversine_m;
use crate::market::structs::{PropertyListing, SearchCriteria};
use crate::structs::ValueRange;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

const PROXIMITY_WEIGHT: f64 = 30.0;
const PRICE_WEIGHT: f64 = 25.0;
const AREA_WEIGHT: f64 = 20.0;
const TYPE_MATCH_BONUS: f64 = 15.0;
const RECENCY_WEIGHT: f64 = 10.0;
const RECENCY_WINDOW_DAYS: f64 = 30.0;

/// Coordinates are rounded to this many decimals (~111 m) to detect duplicates.
pub const DEDUP_GRID_DECIMALS: i32 = 3;

/// How close `value` is to the middle of `band`: 1 at the midpoint, 0.5 at
/// either edge, and 0 once it is a full band width away.
fn band_fit(band: &ValueRange, value: f64) -> f64 {
    let width = band.width();
    let offset = (value - band.midpoint()).abs();
    if width <= 0.0 {
        return if offset < f64::EPSILON { 1.0 } else { 0.0 };
    }
    ((width - offset) / width).max(0.0)
}

fn days_since(published: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let days = now.signed_duration_since(published).num_days() as f64;
    days.max(0.0)
}

/// Relevance of a single listing in `[0, 100]`.
#[must_use]
pub fn relevance_score(listing: &PropertyListing, criteria: &SearchCriteria, now: DateTime<Utc>) -> f64 {
    let distance = haversine_m(criteria.center, listing.coordinates);
    let mut score = 0.0;

    if criteria.radius_m > 0.0 {
        score += ((criteria.radius_m - distance) / criteria.radius_m).max(0.0) * PROXIMITY_WEIGHT;
    }
    if let Some(band) = &criteria.price_range {
        score += band_fit(band, listing.price) * PRICE_WEIGHT;
    }
    if let Some(band) = &criteria.area_range {
        score += band_fit(band, listing.area) * AREA_WEIGHT;
    }
    if let (Some(wanted), Some(actual)) = (&criteria.property_type, &listing.property_type)
        && wanted.eq_ignore_ascii_case(actual)
    {
        score += TYPE_MATCH_BONUS;
    }
    let age = days_since(listing.publish_date, now);
    score += ((RECENCY_WINDOW_DAYS - age) / RECENCY_WINDOW_DAYS).max(0.0) * RECENCY_WEIGHT;

    score.clamp(0.0, 100.0)
}

/// Drops listings sharing a grid cell and price with an earlier one. Sources
/// earlier in the list win.
#[must_use]
pub fn deduplicate(listings: Vec<PropertyListing>) -> Vec<PropertyListing> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .filter(|listing| {
            #[allow(clippy::cast_possible_truncation)]
            let cents = (listing.price * 100.0).round() as i64;
            seen.insert((listing.coordinates.grid_cell(DEDUP_GRID_DECIMALS), cents))
        })
        .collect()
}

/// Keeps the listings inside the search radius and records their distance.
#[must_use]
pub fn within_radius(listings: Vec<PropertyListing>, criteria: &SearchCriteria) -> Vec<PropertyListing> {
    listings
        .into_iter()
        .filter_map(|mut listing| {
            let distance = haversine_m(criteria.center, listing.coordinates);
            (distance <= criteria.radius_m).then(|| {
                listing.distance_m = Some(distance);
                listing
            })
        })
        .collect()
}

/// Scores every listing and sorts best first. Equal scores put the newer
/// listing first.
#[must_use]
pub fn rank(mut listings: Vec<PropertyListing>, criteria: &SearchCriteria, now: DateTime<Utc>) -> Vec<PropertyListing> {
    for listing in &mut listings {
        listing.relevance_score = Some(relevance_score(listing, criteria, now));
    }
    listings.sort_by(|a, b| {
        let a_score = a.relevance_score.unwrap_or_default();
        let b_score = b.relevance_score.unwrap_or_default();
        b_score
            .total_cmp(&a_score)
            .then_with(|| b.publish_date.cmp(&a.publish_date))
    });
    listings
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geo::structs::Coordinates;
    use chrono::{Duration, TimeZone};

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    pub fn listing(id: &str, latitude: f64, longitude: f64, price: f64, days_old: i64) -> PropertyListing {
        PropertyListing {
            id: id.to_string(),
            title: format!("Listing {id}"),
            price,
            area: 100.0,
            bedrooms: 2,
            bathrooms: 1,
            coordinates: Coordinates::new(latitude, longitude),
            source: "test".to_string(),
            publish_date: now() - Duration::days(days_old),
            property_type: Some("apartment".to_string()),
            neighborhood: Some("Jardins".to_string()),
            distance_m: None,
            relevance_score: None,
        }
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            property_type: Some("Apartment".to_string()),
            price_range: Some(ValueRange::new(400_000.0, 600_000.0)),
            area_range: Some(ValueRange::new(80.0, 120.0)),
            ..SearchCriteria::around(Coordinates::new(-23.561, -46.656), 2_000.0)
        }
    }

    #[test]
    fn test_perfect_match_scores_100() {
        let l = listing("a", -23.561, -46.656, 500_000.0, 0);
        let score = relevance_score(&l, &criteria(), now());
        assert!((score - 100.0).abs() < 1e-9, "score was {score}");
    }

    #[test]
    fn test_score_is_bounded_and_monotonic_in_distance() {
        let c = criteria();
        let mut previous = f64::INFINITY;
        for step in 0..40 {
            let lat = -23.561 + f64::from(step) * 0.001;
            let score = relevance_score(&listing("x", lat, -46.656, 520_000.0, 10), &c, now());
            assert!((0.0..=100.0).contains(&score));
            assert!(score <= previous, "score increased with distance at step {step}");
            previous = score;
        }
    }

    #[test]
    fn test_missing_bands_score_nothing() {
        let c = SearchCriteria::around(Coordinates::new(-23.561, -46.656), 2_000.0);
        let l = listing("a", -23.561, -46.656, 500_000.0, 60);
        // Only proximity counts: no bands, no type hint, too old for recency.
        assert!((relevance_score(&l, &c, now()) - 30.0).abs() < 1e-9);
    }

    /// Score above the 30 proximity points of a listing at the center that is
    /// too old for recency and has no type hint.
    fn band_points(c: &SearchCriteria, price: f64, area: f64) -> f64 {
        let mut l = listing("x", -23.561, -46.656, price, 60);
        l.area = area;
        relevance_score(&l, c, now()) - PROXIMITY_WEIGHT
    }

    #[test]
    fn test_price_band_fit_is_scaled_by_band_width() {
        let c = SearchCriteria {
            price_range: Some(ValueRange::new(400_000.0, 600_000.0)),
            ..SearchCriteria::around(Coordinates::new(-23.561, -46.656), 2_000.0)
        };
        let cases = [
            (500_000.0, 25.0),
            (450_000.0, 18.75),
            (600_000.0, 12.5),
            (400_000.0, 12.5),
            (650_000.0, 6.25),
            (700_000.0, 0.0),
            (900_000.0, 0.0),
        ];
        for (price, expected) in cases {
            let points = band_points(&c, price, 100.0);
            assert!((points - expected).abs() < 1e-9, "price {price}: got {points}, expected {expected}");
        }
    }

    #[test]
    fn test_area_band_fit_is_scaled_by_band_width() {
        let c = SearchCriteria {
            area_range: Some(ValueRange::new(80.0, 120.0)),
            ..SearchCriteria::around(Coordinates::new(-23.561, -46.656), 2_000.0)
        };
        let cases = [
            (100.0, 20.0),
            (110.0, 15.0),
            (120.0, 10.0),
            (80.0, 10.0),
            (130.0, 5.0),
            (140.0, 0.0),
        ];
        for (area, expected) in cases {
            let points = band_points(&c, 500_000.0, area);
            assert!((points - expected).abs() < 1e-9, "area {area}: got {points}, expected {expected}");
        }
    }

    #[test]
    fn test_degenerate_band_only_rewards_exact_value() {
        let c = SearchCriteria {
            price_range: Some(ValueRange::new(500_000.0, 500_000.0)),
            ..SearchCriteria::around(Coordinates::new(-23.561, -46.656), 2_000.0)
        };
        assert!((band_points(&c, 500_000.0, 100.0) - 25.0).abs() < 1e-9);
        assert!(band_points(&c, 500_001.0, 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_deduplicate_same_cell_and_price() {
        let listings = vec![
            listing("a", -23.56101, -46.65601, 500_000.0, 1),
            listing("b", -23.56104, -46.65598, 500_000.0, 2),
            listing("c", -23.56101, -46.65601, 510_000.0, 3),
            listing("d", -23.5700, -46.6560, 500_000.0, 4),
        ];
        let ids: Vec<_> = deduplicate(listings).into_iter().map(|l| l.id).collect();
        assert_eq!(ids, ["a", "c", "d"]);
    }

    #[test]
    fn test_within_radius_drops_far_listings() {
        let c = criteria();
        let kept = within_radius(
            vec![
                listing("near", -23.565, -46.656, 500_000.0, 1),
                listing("far", -23.70, -46.656, 500_000.0, 1),
            ],
            &c,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "near");
        assert!(kept[0].distance_m.unwrap() < 2_000.0);
    }

    #[test]
    fn test_rank_orders_by_score_then_recency() {
        let c = SearchCriteria::around(Coordinates::new(-23.561, -46.656), 2_000.0);
        let ranked = rank(
            vec![
                listing("old", -23.561, -46.656, 500_000.0, 90),
                listing("far", -23.570, -46.656, 500_000.0, 0),
                listing("new", -23.561, -46.656, 500_000.0, 60),
            ],
            &c,
            now(),
        );
        let ids: Vec<_> = ranked.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["new", "old", "far"]);
        assert!(ranked.iter().all(|l| l.relevance_score.is_some()));
    }
}
