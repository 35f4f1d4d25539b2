use crate::error::ProviderError;
use crate::fallback::Named;
use crate::geo::resolver::GeocodingProvider;
use crate::geo::structs::{AddressComponents, Coordinates, GeocodeCandidate};
use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Nominatim usage policy: at most one request per second.
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(1000);

/// Nominatim requires an identifying User-Agent.
const USER_AGENT: &str = concat!("property_analyzer/", env!("CARGO_PKG_VERSION"));

/// Spaces calls at least `interval` apart. Each caller reserves the next free
/// slot under the lock and sleeps outside it, so concurrent callers queue up.
struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    async fn acquire(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next_slot.map_or(now, |next| next.max(now));
            *next_slot = Some(slot + self.interval);
            slot
        };
        let now = Instant::now();
        if slot > now {
            debug!(
                wait_ms = (slot - now).as_millis(),
                "Waiting for Nominatim rate limit slot"
            );
            sleep_until(slot).await;
        }
    }
}

/// OpenStreetMap reverse geocoding. Free and unauthenticated.
pub struct NominatimGeocoder {
    http: Client,
    base_url: String,
    limiter: RateLimiter,
}

#[derive(Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    place_rank: Option<u32>,
    #[serde(default)]
    address: NominatimAddress,
    #[serde(default)]
    extratags: Option<serde_json::Value>,
    name: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize, Default)]
struct NominatimAddress {
    road: Option<String>,
    house_number: Option<String>,
    suburb: Option<String>,
    neighbourhood: Option<String>,
    quarter: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(base_url: Option<String>) -> Result<Self, reqwest::Error> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );
        Ok(Self {
            http: Client::builder().default_headers(headers).build()?,
            base_url: base_url.unwrap_or_else(|| NOMINATIM_URL.to_string()),
            limiter: RateLimiter::new(RATE_LIMIT_INTERVAL),
        })
    }
}

/// `place_rank` runs from 4 (country) to 30 (building).
fn place_rank_confidence(place_rank: Option<u32>) -> f64 {
    match place_rank {
        Some(rank) if rank >= 30 => 0.9,
        Some(rank) if rank >= 26 => 0.8,
        Some(rank) if rank >= 17 => 0.65,
        Some(rank) if rank >= 12 => 0.5,
        _ => 0.3,
    }
}

fn parse_response(response: ReverseResponse) -> Vec<GeocodeCandidate> {
    if response.error.is_some() {
        return Vec::new();
    }
    let Some(formatted_address) = response.display_name else {
        return Vec::new();
    };
    let address = response.address;

    let street = match (address.road, address.house_number) {
        (Some(road), Some(number)) => Some(format!("{road}, {number}")),
        (road, _) => road,
    };
    // A named place with extra tags is a landmark in its own right.
    let nearby_places = response
        .name
        .filter(|_| response.extratags.as_ref().is_some_and(|t| !t.is_null()))
        .into_iter()
        .collect();

    vec![GeocodeCandidate {
        formatted_address,
        components: AddressComponents {
            street,
            neighborhood: address
                .suburb
                .or(address.neighbourhood)
                .or(address.quarter),
            city: address
                .city
                .or(address.town)
                .or(address.village)
                .or(address.municipality),
            state: address.state,
            postal_code: address.postcode,
            country: address.country,
        },
        confidence: place_rank_confidence(response.place_rank),
        nearby_places,
    }]
}

impl Named for NominatimGeocoder {
    fn name(&self) -> &str {
        "nominatim"
    }
}

#[async_trait]
impl GeocodingProvider for NominatimGeocoder {
    async fn reverse(
        &self,
        coordinates: Coordinates,
    ) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        self.limiter.acquire().await;

        let url = format!("{}/reverse", self.base_url);
        let response = self
            .http
            .get(url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("addressdetails", "1".to_string()),
                ("extratags", "1".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(ProviderError::from_status(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }
        Ok(parse_response(response.json().await?))
    }
}
