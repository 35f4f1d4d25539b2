use crate::error::ProviderError;
use crate::fallback::{Named, ProviderAttempt, Stage, fan_out};
use crate::market::aggregation::snapshot;
use crate::market::ranking::{deduplicate, rank, within_radius};
use crate::market::structs::{MarketResult, PropertyListing, SearchCriteria};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// "Given coordinates and filters, return candidate listings."
#[async_trait]
pub trait ListingSource: Named + Send + Sync {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<PropertyListing>, ProviderError>;
}

/// Queries every listing source at once and turns the combined answers into
/// ranked comparables and market statistics.
pub struct MarketEngine {
    sources: Vec<Arc<dyn ListingSource>>,
    timeout: Duration,
    top_comparables: usize,
}

impl MarketEngine {
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn ListingSource>>, timeout: Duration, top_comparables: usize) -> Self {
        Self {
            sources,
            timeout,
            top_comparables,
        }
    }

    #[must_use]
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Returns `None` when no source produced a listing inside the radius.
    /// A failing source only empties its own share of the results.
    pub async fn search(
        &self,
        criteria: &SearchCriteria,
        now: DateTime<Utc>,
    ) -> (Option<MarketResult>, Vec<ProviderAttempt>) {
        let (answers, attempts) = fan_out(Stage::Listings, &self.sources, self.timeout, |source| {
            source.search(criteria)
        })
        .await;

        let collected: Vec<PropertyListing> = answers
            .into_iter()
            .flat_map(|answer| {
                let provider = answer.provider;
                answer.value.into_iter().map(move |mut listing| {
                    if listing.source.is_empty() {
                        listing.source.clone_from(&provider);
                    }
                    listing
                })
            })
            .collect();
        let received = collected.len();

        let listings = deduplicate(within_radius(collected, criteria));
        debug!(
            received,
            kept = listings.len(),
            radius_m = criteria.radius_m,
            "Filtered and deduplicated listings"
        );
        if listings.is_empty() {
            return (None, attempts);
        }

        let snapshot = snapshot(&listings, criteria, now);
        let mut comparables = rank(listings, criteria, now);
        comparables.truncate(self.top_comparables);
        info!(
            total = snapshot.total_properties,
            comparables = comparables.len(),
            "Market search complete"
        );

        (
            Some(MarketResult {
                snapshot,
                comparables,
            }),
            attempts,
        )
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockListings;
    use super::*;
    use crate::geo::structs::Coordinates;

    fn criteria() -> SearchCriteria {
        SearchCriteria::around(Coordinates::new(-23.561, -46.656), 2_000.0)
    }

    #[tokio::test]
    async fn test_failing_source_is_isolated() {
        let sources: Vec<Arc<dyn ListingSource>> = vec![
            MockListings::new("a", 5, 500_000.0),
            MockListings::failing("broken"),
            MockListings::new("b", 5, 700_000.0),
        ];
        let engine = MarketEngine::new(sources, Duration::from_secs(1), 10);

        let (result, attempts) = engine.search(&criteria(), Utc::now()).await;

        let result = result.unwrap();
        assert_eq!(result.snapshot.total_properties, 10);
        assert_eq!(result.snapshot.by_source["a"], 5);
        assert_eq!(attempts.len(), 3);
        assert!(!attempts.iter().find(|a| a.provider == "broken").unwrap().succeeded);
    }

    #[tokio::test]
    async fn test_duplicates_across_sources_collapse() {
        let sources: Vec<Arc<dyn ListingSource>> = vec![
            MockListings::new("a", 3, 500_000.0),
            MockListings::new("b", 3, 500_000.0),
        ];
        let engine = MarketEngine::new(sources, Duration::from_secs(1), 10);

        let (result, _) = engine.search(&criteria(), Utc::now()).await;

        let result = result.unwrap();
        assert_eq!(result.snapshot.total_properties, 3);
        assert_eq!(result.snapshot.by_source.get("b"), None);
    }

    #[tokio::test]
    async fn test_comparables_are_truncated_but_stats_are_not() {
        let sources: Vec<Arc<dyn ListingSource>> = vec![MockListings::new("a", 8, 500_000.0)];
        let engine = MarketEngine::new(sources, Duration::from_secs(1), 3);

        let (result, _) = engine.search(&criteria(), Utc::now()).await;

        let result = result.unwrap();
        assert_eq!(result.comparables.len(), 3);
        assert_eq!(result.snapshot.total_properties, 8);
        let scores: Vec<f64> = result
            .comparables
            .iter()
            .map(|l| l.relevance_score.unwrap())
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_no_listings_is_none() {
        let sources: Vec<Arc<dyn ListingSource>> = vec![MockListings::failing("broken")];
        let engine = MarketEngine::new(sources, Duration::from_secs(1), 10);
        let (result, attempts) = engine.search(&criteria(), Utc::now()).await;
        assert!(result.is_none());
        assert_eq!(attempts.len(), 1);
    }
}
