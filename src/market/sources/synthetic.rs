use crate::error::ProviderError;
use crate::fallback::Named;
use crate::geo::structs::Coordinates;
use crate::market::engine::ListingSource;
use crate::market::structs::{PropertyListing, SearchCriteria};
use async_trait::async_trait;
use bon::bon;
use chrono::{Duration, Utc};

const METERS_PER_DEGREE: f64 = 111_320.0;

const NEIGHBORHOODS: &[&str] = &[
    "Centro",
    "Jardim América",
    "Vila Nova",
    "Bela Vista",
    "Alto da Boa Vista",
    "Parque das Flores",
];

/// `(property type, typical price per square meter, area range in m²)`
const PROFILES: &[(&str, f64, (f64, f64))] = &[
    ("apartment", 9_500.0, (45.0, 140.0)),
    ("house", 7_500.0, (90.0, 320.0)),
    ("studio", 11_000.0, (25.0, 45.0)),
    ("commercial", 8_000.0, (60.0, 400.0)),
];

/// Generates plausible listings around the search center.
///
/// The output is a pure function of the source name and the searched grid
/// cell, so the same search always sees the same market. Useful for demos and
/// as a stand-in until a real listing feed is configured.
pub struct SyntheticListingSource {
    name: String,
    listings_per_search: usize,
    max_age_days: i64,
}

#[bon]
impl SyntheticListingSource {
    #[builder(start_fn = with_name)]
    pub fn new(
        #[builder(start_fn)] name: &str,
        #[builder(default = 8)] listings_per_search: usize,
        #[builder(default = 90)] max_age_days: i64,
    ) -> Self {
        Self {
            name: name.to_string(),
            listings_per_search,
            max_age_days: max_age_days.max(1),
        }
    }

    fn seed(&self, center: Coordinates) -> u64 {
        let (lat_cell, lon_cell) = center.grid_cell(3);
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.name.as_bytes());
        hasher.update(&lat_cell.to_le_bytes());
        hasher.update(&lon_cell.to_le_bytes());
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
        u64::from_le_bytes(seed)
    }
}

/// Moves `distance_m` from `center` along `bearing` (radians) on a locally
/// flat earth.
fn offset(center: Coordinates, distance_m: f64, bearing: f64) -> Coordinates {
    let d_lat = distance_m * bearing.cos() / METERS_PER_DEGREE;
    let d_lon =
        distance_m * bearing.sin() / (METERS_PER_DEGREE * center.latitude.to_radians().cos());
    Coordinates::new(center.latitude + d_lat, center.longitude + d_lon)
}

fn round_to(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

impl Named for SyntheticListingSource {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl ListingSource for SyntheticListingSource {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<PropertyListing>, ProviderError> {
        let mut rng = fastrand::Rng::with_seed(self.seed(criteria.center));
        let now = Utc::now();

        let listings = (0..self.listings_per_search)
            .map(|i| {
                let (kind, base_ppa, (min_area, max_area)) = match &criteria.property_type {
                    Some(wanted) if rng.f64() < 0.7 => PROFILES
                        .iter()
                        .find(|(kind, ..)| kind.eq_ignore_ascii_case(wanted))
                        .copied()
                        .unwrap_or(PROFILES[0]),
                    _ => PROFILES[rng.usize(..PROFILES.len())],
                };
                let area = round_to(min_area + rng.f64() * (max_area - min_area), 1.0);
                let ppa = base_ppa * (0.8 + rng.f64() * 0.4);
                let price = round_to(area * ppa, 1_000.0);
                let distance = criteria.radius_m * 0.95 * rng.f64().sqrt();
                let bearing = rng.f64() * std::f64::consts::TAU;
                let bedrooms = rng.u32(1..=4);
                let neighborhood = NEIGHBORHOODS[rng.usize(..NEIGHBORHOODS.len())];

                PropertyListing {
                    id: format!("{}-{:x}-{i}", self.name, rng.u32(..)),
                    title: format!("{bedrooms}-bedroom {kind} in {neighborhood}"),
                    price,
                    area,
                    bedrooms,
                    bathrooms: rng.u32(1..=bedrooms),
                    coordinates: offset(criteria.center, distance, bearing),
                    source: self.name.clone(),
                    publish_date: now - Duration::days(rng.i64(0..self.max_age_days)),
                    property_type: Some(kind.to_string()),
                    neighborhood: Some(neighborhood.to_string()),
                    distance_m: None,
                    relevance_score: None,
                }
            })
            .collect();
        Ok(listings)
    }
}
