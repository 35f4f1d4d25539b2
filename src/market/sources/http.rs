use crate::error::ProviderError;
use crate::fallback::Named;
use crate::market::engine::ListingSource;
use crate::market::structs::{PropertyListing, SearchCriteria};
use async_trait::async_trait;
use bon::bon;
use reqwest::Client;
use serde::Deserialize;

/// A listing feed reachable over HTTP.
///
/// Issues `GET {base_url}/listings` with the search as query parameters and
/// expects either a JSON array of listings or `{"listings": [...]}`.
pub struct HttpListingSource {
    http: Client,
    name: String,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListingsResponse {
    Bare(Vec<PropertyListing>),
    Wrapped { listings: Vec<PropertyListing> },
}

impl ListingsResponse {
    fn into_listings(self) -> Vec<PropertyListing> {
        match self {
            Self::Bare(listings) | Self::Wrapped { listings } => listings,
        }
    }
}

#[bon]
impl HttpListingSource {
    #[builder(start_fn = with_base_url)]
    pub fn new(
        #[builder(start_fn)] base_url: &str,
        #[builder(default = "listings-api".to_string())] name: String,
        api_key: Option<String>,
        http: Option<Client>,
    ) -> Self {
        Self {
            http: http.unwrap_or_default(),
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn query(criteria: &SearchCriteria) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("lat", criteria.center.latitude.to_string()),
            ("lon", criteria.center.longitude.to_string()),
            ("radius", criteria.radius_m.to_string()),
        ];
        if let Some(kind) = &criteria.property_type {
            query.push(("type", kind.clone()));
        }
        if let Some(band) = &criteria.price_range {
            query.push(("minPrice", band.min.to_string()));
            query.push(("maxPrice", band.max.to_string()));
        }
        if let Some(band) = &criteria.area_range {
            query.push(("minArea", band.min.to_string()));
            query.push(("maxArea", band.max.to_string()));
        }
        query
    }
}

impl Named for HttpListingSource {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<PropertyListing>, ProviderError> {
        let url = format!("{}/listings", self.base_url);
        let mut request = self.http.get(url).query(&Self::query(criteria));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(ProviderError::from_status(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }
        let body = response.text().await?;
        let mut listings = serde_json::from_str::<ListingsResponse>(&body)?.into_listings();
        for listing in &mut listings {
            listing.relevance_score = None;
            listing.distance_m = None;
        }
        Ok(listings)
    }
}
