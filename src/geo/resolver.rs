use crate::error::ProviderError;
use crate::fallback::{Named, ProviderAttempt, Stage, Winner, all_successes, first_success};
use crate::geo::structs::{
    Accuracy, AddressComponents, AlternativeLocation, Coordinates, GeocodeCandidate,
    LocationResolution,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::slice;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Confidence of the coordinates-only result used when nobody answers.
pub const DEGRADED_CONFIDENCE: f64 = 0.1;
/// Provider label of the coordinates-only result.
pub const DEGRADED_PROVIDER: &str = "coordinates";

/// "Given coordinates, return candidate addresses with confidence."
#[async_trait]
pub trait GeocodingProvider: Named + Send + Sync {
    async fn reverse(
        &self,
        coordinates: Coordinates,
    ) -> Result<Vec<GeocodeCandidate>, ProviderError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodingStrategy {
    /// Stop at the first provider that returns a candidate.
    #[default]
    FirstAnswer,
    /// Ask every provider and keep the most confident candidate.
    Consolidate,
}

/// Turns coordinates into an address using an ordered provider chain, then a
/// free fallback, then a coordinates-only result. Never fails.
pub struct LocationResolver {
    providers: Vec<Arc<dyn GeocodingProvider>>,
    fallback: Option<Arc<dyn GeocodingProvider>>,
    strategy: GeocodingStrategy,
    timeout: Duration,
}

/// A provider only "answers" when it returns at least one candidate with a
/// finite confidence. Other candidates are dropped.
async fn answered(
    provider: &dyn GeocodingProvider,
    coordinates: Coordinates,
) -> Result<Vec<GeocodeCandidate>, ProviderError> {
    let candidates = provider.reverse(coordinates).await?;
    if candidates.is_empty() {
        return Err(ProviderError::NoResults);
    }
    let usable: Vec<GeocodeCandidate> = candidates
        .into_iter()
        .filter(|c| c.confidence.is_finite())
        .collect();
    if usable.is_empty() {
        return Err(ProviderError::Malformed(
            "candidate confidence is not a finite number".to_string(),
        ));
    }
    Ok(usable)
}

impl LocationResolver {
    #[must_use]
    pub fn new(
        providers: Vec<Arc<dyn GeocodingProvider>>,
        fallback: Option<Arc<dyn GeocodingProvider>>,
        strategy: GeocodingStrategy,
        timeout: Duration,
    ) -> Self {
        Self {
            providers,
            fallback,
            strategy,
            timeout,
        }
    }

    pub async fn resolve(
        &self,
        coordinates: Coordinates,
    ) -> (LocationResolution, Vec<ProviderAttempt>) {
        let (winners, mut attempts) = match self.strategy {
            GeocodingStrategy::FirstAnswer => {
                let outcome = first_success(Stage::Geocoding, &self.providers, self.timeout, |p| {
                    answered(p, coordinates)
                })
                .await;
                (outcome.winner.into_iter().collect(), outcome.attempts)
            }
            GeocodingStrategy::Consolidate => {
                all_successes(Stage::Geocoding, &self.providers, self.timeout, |p| {
                    answered(p, coordinates)
                })
                .await
            }
        };

        if let Some(resolution) = consolidate(coordinates, winners) {
            return (resolution, attempts);
        }

        if let Some(fallback) = &self.fallback {
            debug!("No geocoding provider answered, trying fallback");
            let outcome = first_success(
                Stage::Geocoding,
                slice::from_ref(fallback),
                self.timeout,
                |p| answered(p, coordinates),
            )
            .await;
            attempts.extend(outcome.attempts);
            if let Some(resolution) = consolidate(coordinates, outcome.winner.into_iter().collect())
            {
                return (resolution, attempts);
            }
        }

        warn!(%coordinates, "Every geocoder failed, using raw coordinates");
        (degraded(coordinates), attempts)
    }
}

/// Picks the most confident candidate across all answers as the primary
/// result and keeps every other candidate as an alternative.
fn consolidate(
    coordinates: Coordinates,
    winners: Vec<Winner<Vec<GeocodeCandidate>>>,
) -> Option<LocationResolution> {
    let mut candidates: Vec<(String, GeocodeCandidate)> = winners
        .into_iter()
        .flat_map(|w| {
            let provider = w.provider;
            w.value.into_iter().map(move |c| (provider.clone(), c))
        })
        .collect();
    // Stable sort keeps provider priority order among equal confidences.
    candidates.sort_by(|a, b| b.1.confidence.total_cmp(&a.1.confidence));

    let mut iter = candidates.into_iter();
    let (provider, primary) = iter.next()?;
    let confidence = primary.confidence.clamp(0.01, 1.0);
    let alternatives = iter
        .map(|(provider, c)| AlternativeLocation {
            provider,
            formatted_address: c.formatted_address,
            confidence: c.confidence.clamp(0.0, 1.0),
        })
        .collect();

    Some(LocationResolution {
        coordinates,
        formatted_address: primary.formatted_address,
        components: primary.components,
        provider,
        confidence,
        accuracy: Accuracy::from_confidence(confidence),
        nearby_places: primary.nearby_places,
        alternatives,
        degraded: false,
    })
}

fn degraded(coordinates: Coordinates) -> LocationResolution {
    LocationResolution {
        coordinates,
        formatted_address: coordinates.to_string(),
        components: AddressComponents::default(),
        provider: DEGRADED_PROVIDER.to_string(),
        confidence: DEGRADED_CONFIDENCE,
        accuracy: Accuracy::Low,
        nearby_places: Vec::new(),
        alternatives: Vec::new(),
        degraded: true,
    }
}
