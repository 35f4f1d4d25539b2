use crate::error::ProviderError;
use crate::fallback::Named;
use crate::geo::resolver::GeocodingProvider;
use crate::geo::structs::{AddressComponents, Coordinates, GeocodeCandidate};
use async_trait::async_trait;
use bon::bon;
use reqwest::Client;
use serde::Deserialize;

const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Google Maps reverse geocoding (authenticated).
pub struct GoogleGeocoder {
    http: Client,
    api_key: String,
    base_url: String,
    language: Option<String>,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    geometry: Geometry,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Deserialize)]
struct AddressComponent {
    long_name: String,
    short_name: String,
    types: Vec<String>,
}

#[derive(Deserialize)]
struct Geometry {
    location_type: Option<String>,
}

#[bon]
impl GoogleGeocoder {
    #[builder(start_fn = with_api_key)]
    pub fn new(
        #[builder(start_fn)] api_key: &str,
        http: Option<Client>,
        base_url: Option<String>,
        language: Option<String>,
    ) -> Self {
        Self {
            http: http.unwrap_or_default(),
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| GOOGLE_GEOCODE_URL.to_string()),
            language,
        }
    }
}

/// Maps Google's `location_type` precision to a confidence value.
fn location_type_confidence(location_type: Option<&str>) -> f64 {
    match location_type {
        Some("ROOFTOP") => 0.95,
        Some("RANGE_INTERPOLATED") => 0.85,
        Some("GEOMETRIC_CENTER") => 0.7,
        Some("APPROXIMATE") => 0.5,
        _ => 0.4,
    }
}

fn component<'a>(result: &'a GeocodeResult, kinds: &[&str]) -> Option<&'a AddressComponent> {
    kinds.iter().find_map(|kind| {
        result
            .address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
    })
}

fn long_name(result: &GeocodeResult, kinds: &[&str]) -> Option<String> {
    component(result, kinds).map(|c| c.long_name.clone())
}

fn is_point_of_interest(result: &GeocodeResult) -> bool {
    result
        .types
        .iter()
        .any(|t| t == "point_of_interest" || t == "establishment" || t == "park")
}

fn to_candidate(result: &GeocodeResult, nearby_places: Vec<String>) -> GeocodeCandidate {
    let street = match (
        long_name(result, &["route"]),
        long_name(result, &["street_number"]),
    ) {
        (Some(route), Some(number)) => Some(format!("{route}, {number}")),
        (route, _) => route,
    };

    GeocodeCandidate {
        formatted_address: result.formatted_address.clone(),
        components: AddressComponents {
            street,
            neighborhood: long_name(
                result,
                &["sublocality_level_1", "sublocality", "neighborhood"],
            ),
            city: long_name(result, &["locality", "administrative_area_level_2"]),
            state: component(result, &["administrative_area_level_1"])
                .map(|c| c.short_name.clone()),
            postal_code: long_name(result, &["postal_code"]),
            country: long_name(result, &["country"]),
        },
        confidence: location_type_confidence(result.geometry.location_type.as_deref()),
        nearby_places,
    }
}

fn parse_response(response: GeocodeResponse) -> Result<Vec<GeocodeCandidate>, ProviderError> {
    let message = response.error_message.unwrap_or_default();
    match response.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(Vec::new()),
        "REQUEST_DENIED" => return Err(ProviderError::Unauthorized(message)),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => return Err(ProviderError::Overloaded(message)),
        other => {
            return Err(ProviderError::Malformed(format!(
                "unexpected geocoding status {other}: {message}"
            )));
        }
    }

    let nearby_places: Vec<String> = response
        .results
        .iter()
        .filter(|r| is_point_of_interest(r))
        .filter_map(|r| r.address_components.first().map(|c| c.long_name.clone()))
        .collect();

    Ok(response
        .results
        .iter()
        .filter(|r| !is_point_of_interest(r))
        .map(|r| to_candidate(r, nearby_places.clone()))
        .collect())
}

impl Named for GoogleGeocoder {
    fn name(&self) -> &str {
        "google"
    }
}

#[async_trait]
impl GeocodingProvider for GoogleGeocoder {
    async fn reverse(
        &self,
        coordinates: Coordinates,
    ) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        let latlng = format!("{},{}", coordinates.latitude, coordinates.longitude);
        let mut query = vec![("latlng", latlng.as_str()), ("key", self.api_key.as_str())];
        if let Some(language) = &self.language {
            query.push(("language", language.as_str()));
        }

        let response = self.http.get(&self.base_url).query(&query).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(ProviderError::from_status(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }
        parse_response(response.json().await?)
    }
}
