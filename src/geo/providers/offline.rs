use crate::error::ProviderError;
use crate::fallback::Named;
use crate::geo::distance::haversine_m;
use crate::geo::resolver::GeocodingProvider;
use crate::geo::structs::{AddressComponents, Coordinates, GeocodeCandidate};
use async_trait::async_trait;
use reverse_geocoder::ReverseGeocoder;

/// Beyond this distance from the nearest known locality the match is useless.
const MAX_MATCH_DISTANCE_M: f64 = 50_000.0;

/// Offline lookup against the bundled GeoNames cities table.
///
/// Only resolves to locality level (city, region, country), so it is the
/// default last-resort fallback rather than a primary provider.
pub struct OfflineGeocoder {
    geocoder: ReverseGeocoder,
}

impl OfflineGeocoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            geocoder: ReverseGeocoder::new(),
        }
    }

    fn lookup(&self, coordinates: Coordinates) -> Option<GeocodeCandidate> {
        let search_result = self
            .geocoder
            .search((coordinates.latitude, coordinates.longitude));
        let record = search_result.record;
        let distance_m = haversine_m(coordinates, Coordinates::new(record.lat, record.lon));
        if distance_m > MAX_MATCH_DISTANCE_M {
            return None;
        }

        let country_name = rust_iso3166::from_alpha2(&record.cc)
            .map_or_else(|| record.cc.clone(), |c| c.name.to_string());
        let formatted_address = [record.name.as_str(), record.admin1.as_str(), &country_name]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ");

        Some(GeocodeCandidate {
            formatted_address,
            components: AddressComponents {
                street: None,
                neighborhood: None,
                city: Some(record.name.clone()),
                state: (!record.admin1.is_empty()).then(|| record.admin1.clone()),
                postal_code: None,
                country: Some(country_name),
            },
            confidence: distance_confidence(distance_m),
            nearby_places: Vec::new(),
        })
    }
}

impl Default for OfflineGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

/// 0.6 at the locality centroid, decaying linearly to 0.2 at the cut-off.
fn distance_confidence(distance_m: f64) -> f64 {
    let closeness = (1.0 - distance_m / MAX_MATCH_DISTANCE_M).clamp(0.0, 1.0);
    0.4f64.mul_add(closeness, 0.2)
}

impl Named for OfflineGeocoder {
    fn name(&self) -> &str {
        "geonames-offline"
    }
}

#[async_trait]
impl GeocodingProvider for OfflineGeocoder {
    async fn reverse(
        &self,
        coordinates: Coordinates,
    ) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        Ok(self.lookup(coordinates).into_iter().collect())
    }
}
