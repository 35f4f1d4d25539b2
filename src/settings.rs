//! Which HTTP adapters to build, and with which credentials.

use crate::AnalyzerError;
use crate::geo::GeocodingProvider;
use crate::geo::providers::{GoogleGeocoder, NominatimGeocoder};
use crate::market::ListingSource;
use crate::market::sources::{HttpListingSource, SyntheticListingSource};
use crate::property_analyzer::PropertyAnalyzer;
use crate::vision::VisionProvider;
use crate::vision::providers::{ChatCompletionsVision, GeminiVision};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const fn yes() -> bool {
    true
}

/// Provider credentials and endpoints. Every adapter is optional; an unset
/// key simply leaves that adapter out of its chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    #[serde(default)]
    pub google_maps_api_key: Option<String>,
    #[serde(default = "yes")]
    pub nominatim: bool,
    #[serde(default)]
    pub nominatim_url: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    /// Any OpenAI-compatible server. Setting this without a key enables the
    /// adapter for local, unauthenticated endpoints.
    #[serde(default)]
    pub openai_base_url: Option<String>,
    #[serde(default)]
    pub openai_vision_model: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub gemini_model: Option<String>,
    #[serde(default)]
    pub listings_api_url: Option<String>,
    #[serde(default)]
    pub listings_api_key: Option<String>,
    /// Adds the deterministic synthetic listing source.
    #[serde(default = "yes")]
    pub synthetic_listings: bool,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            google_maps_api_key: None,
            nominatim: true,
            nominatim_url: None,
            openai_api_key: None,
            openai_base_url: None,
            openai_vision_model: None,
            gemini_api_key: None,
            gemini_model: None,
            listings_api_url: None,
            listings_api_key: None,
            synthetic_listings: true,
        }
    }
}

impl ProviderSettings {
    /// Reads `GOOGLE_MAPS_API_KEY`, `NOMINATIM_URL`, `OPENAI_API_KEY`,
    /// `OPENAI_BASE_URL`, `OPENAI_VISION_MODEL`, `GEMINI_API_KEY`,
    /// `GEMINI_MODEL`, `LISTINGS_API_URL` and `LISTINGS_API_KEY`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Empty values count as unset.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let listings_api_url = get("LISTINGS_API_URL");
        Self {
            google_maps_api_key: get("GOOGLE_MAPS_API_KEY"),
            nominatim: true,
            nominatim_url: get("NOMINATIM_URL"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL"),
            openai_vision_model: get("OPENAI_VISION_MODEL"),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL"),
            listings_api_key: get("LISTINGS_API_KEY"),
            synthetic_listings: listings_api_url.is_none(),
            listings_api_url,
        }
    }

    /// Google first (most precise), then Nominatim.
    ///
    /// # Errors
    ///
    /// Fails if the Nominatim HTTP client cannot be constructed.
    pub fn geocoders(&self) -> Result<Vec<Arc<dyn GeocodingProvider>>, AnalyzerError> {
        let mut geocoders: Vec<Arc<dyn GeocodingProvider>> = Vec::new();
        if let Some(key) = &self.google_maps_api_key {
            geocoders.push(Arc::new(GoogleGeocoder::with_api_key(key).build()));
        }
        if self.nominatim {
            geocoders.push(Arc::new(NominatimGeocoder::new(self.nominatim_url.clone())?));
        }
        Ok(geocoders)
    }

    /// OpenAI-compatible first, then Gemini.
    #[must_use]
    pub fn vision_providers(&self) -> Vec<Arc<dyn VisionProvider>> {
        let mut providers: Vec<Arc<dyn VisionProvider>> = Vec::new();
        if self.openai_api_key.is_some() || self.openai_base_url.is_some() {
            providers.push(Arc::new(
                ChatCompletionsVision::builder()
                    .maybe_api_key(self.openai_api_key.clone())
                    .maybe_base_url(self.openai_base_url.clone())
                    .maybe_model(self.openai_vision_model.clone())
                    .build(),
            ));
        }
        if let Some(key) = &self.gemini_api_key {
            providers.push(Arc::new(
                GeminiVision::with_api_key(key)
                    .maybe_model(self.gemini_model.clone())
                    .build(),
            ));
        }
        providers
    }

    #[must_use]
    pub fn listing_sources(&self) -> Vec<Arc<dyn ListingSource>> {
        let mut sources: Vec<Arc<dyn ListingSource>> = Vec::new();
        if let Some(url) = &self.listings_api_url {
            sources.push(Arc::new(
                HttpListingSource::with_base_url(url)
                    .maybe_api_key(self.listings_api_key.clone())
                    .build(),
            ));
        }
        if self.synthetic_listings {
            sources.push(Arc::new(SyntheticListingSource::with_name("synthetic").build()));
        }
        sources
    }

    /// An analyzer with every configured adapter and default tuning.
    ///
    /// # Errors
    ///
    /// See [`Self::geocoders`].
    pub fn build_analyzer(&self) -> Result<PropertyAnalyzer, AnalyzerError> {
        let geocoders = self.geocoders()?;
        let vision_providers = self.vision_providers();
        let listing_sources = self.listing_sources();
        info!(
            geocoders = geocoders.len(),
            vision_providers = vision_providers.len(),
            listing_sources = listing_sources.len(),
            "Building analyzer from provider settings"
        );
        PropertyAnalyzer::builder()
            .geocoders(geocoders)
            .vision_providers(vision_providers)
            .listing_sources(listing_sources)
            .build()
    }
}
