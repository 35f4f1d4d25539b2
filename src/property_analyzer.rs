use crate::AnalyzerError;
use crate::capture::{extract_capture_metadata, sniff_image};
use crate::error::MetadataError;
use crate::fallback::{PipelineTrace, Stage, StageTiming, elapsed_ms};
use crate::geo::providers::OfflineGeocoder;
use crate::geo::structs::Coordinates;
use crate::geo::{GeocodingProvider, GeocodingStrategy, LocationResolver};
use crate::market::structs::SearchCriteria;
use crate::market::{ListingSource, MarketEngine};
use crate::structs::{AnalysisReport, ImageAsset, PropertyContext};
use crate::synthesis::{SynthesisInput, synthesize};
use crate::vision::heuristic::heuristic_analysis;
use crate::vision::{VisionProvider, VisualAnalysisOrchestrator};
use bon::bon;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// The single entry point of the appraisal pipeline.
///
/// Holds the provider chains and tuning knobs. It is read-only after
/// construction, so one instance can be shared (e.g. behind an `Arc`) by
/// any number of concurrent `analyze` calls.
///
/// ```rust,no_run
/// # use property_analyzer::{AnalyzerError, ImageAsset, PropertyAnalyzer, PropertyContext};
/// # #[tokio::main]
/// # async fn main() -> Result<(), AnalyzerError> {
/// let analyzer = PropertyAnalyzer::builder()
///     .search_radius_m(1_500.0)
///     .build()?;
/// let photo = ImageAsset::new("sala.jpg", "image/jpeg", std::fs::read("sala.jpg").unwrap_or_default());
/// let report = analyzer.analyze(&photo, None, &PropertyContext::default()).await;
/// println!("{}", report.contextual_analysis);
/// # Ok(())
/// # }
/// ```
pub struct PropertyAnalyzer {
    resolver: LocationResolver,
    market: MarketEngine,
    vision: VisualAnalysisOrchestrator,
    search_radius_m: f64,
}

#[bon]
impl PropertyAnalyzer {
    /// Constructs a `PropertyAnalyzer` via a builder pattern.
    ///
    /// # Builder Arguments
    ///
    /// * `geocoders` - Reverse geocoders in priority order. Default: none.
    /// * `geocoding_fallback` - Tried after every geocoder failed. When unset,
    ///   the offline GeoNames lookup is used unless `offline_fallback` is `false`.
    /// * `listing_sources` - Queried concurrently for comparables. Default: none.
    /// * `vision_providers` - Vision models in priority order. Default: none,
    ///   which always yields the local heuristic.
    /// * `provider_timeout` - (Default: 20 s) Deadline of a single provider call.
    /// * `geocoding_strategy` - (Default: `FirstAnswer`)
    /// * `search_radius_m` - (Default: `2000.0`) Radius of the comparable search.
    /// * `top_comparables` - (Default: `10`) How many ranked listings the report keeps.
    /// * `overload_retries` - (Default: `2`) Extra attempts on an overloaded
    ///   vision provider.
    /// * `overload_retry_delay` - (Default: 2 s)
    ///
    /// # Errors
    ///
    /// [`AnalyzerError::Config`] when the radius is not a positive number or
    /// `top_comparables` is zero.
    #[builder]
    pub fn new(
        #[builder(default)] geocoders: Vec<Arc<dyn GeocodingProvider>>,
        geocoding_fallback: Option<Arc<dyn GeocodingProvider>>,
        #[builder(default = true)] offline_fallback: bool,
        #[builder(default)] listing_sources: Vec<Arc<dyn ListingSource>>,
        #[builder(default)] vision_providers: Vec<Arc<dyn VisionProvider>>,
        #[builder(default = Duration::from_secs(20))] provider_timeout: Duration,
        #[builder(default)] geocoding_strategy: GeocodingStrategy,
        #[builder(default = 2_000.0)] search_radius_m: f64,
        #[builder(default = 10)] top_comparables: usize,
        #[builder(default = 2)] overload_retries: u32,
        #[builder(default = Duration::from_secs(2))] overload_retry_delay: Duration,
    ) -> Result<Self, AnalyzerError> {
        if !search_radius_m.is_finite() || search_radius_m <= 0.0 {
            return Err(AnalyzerError::Config(format!(
                "search radius must be a positive number of meters, got {search_radius_m}"
            )));
        }
        if top_comparables == 0 {
            return Err(AnalyzerError::Config(
                "top_comparables must be at least 1".to_string(),
            ));
        }

        let fallback = geocoding_fallback.or_else(|| {
            offline_fallback
                .then(|| Arc::new(OfflineGeocoder::new()) as Arc<dyn GeocodingProvider>)
        });

        Ok(Self {
            resolver: LocationResolver::new(geocoders, fallback, geocoding_strategy, provider_timeout),
            market: MarketEngine::new(listing_sources, provider_timeout, top_comparables),
            vision: VisualAnalysisOrchestrator::new(
                vision_providers,
                provider_timeout,
                overload_retries,
                overload_retry_delay,
            ),
            search_radius_m,
        })
    }

    /// Runs the whole pipeline on one photograph.
    ///
    /// Never fails: provider outages degrade their own part of the report
    /// and an unreadable asset yields `success = false` with an explanation,
    /// a heuristic visual analysis and whatever narrative is still possible.
    ///
    /// * `instruction` - Optional prompt for the vision model. A real-estate
    ///   appraisal prompt is used when `None`.
    /// * `context` - Caller knowledge about the property. Its `coordinates`
    ///   enable the comparable search for photos without GPS tags.
    pub async fn analyze(
        &self,
        asset: &ImageAsset,
        instruction: Option<&str>,
        context: &PropertyContext,
    ) -> AnalysisReport {
        let started = Instant::now();
        let asset_fingerprint = blake3::hash(asset.bytes()).to_hex().to_string();
        let mut trace = PipelineTrace::default();

        if let Err(e) = sniff_image(asset) {
            return Self::unreadable(asset, e, context, asset_fingerprint, trace, started);
        }

        // Vision is polled first so its request is in flight while the
        // synchronous EXIF parse runs.
        let ((visual, vision_attempts, vision_ms), (metadata, metadata_ms)) = tokio::join!(
            async {
                let started = Instant::now();
                let (visual, attempts) = self.vision.analyze(asset, instruction).await;
                (visual, attempts, elapsed_ms(started))
            },
            async {
                let started = Instant::now();
                let metadata = extract_capture_metadata(asset);
                (metadata, elapsed_ms(started))
            },
        );
        trace.stages.push(StageTiming {
            stage: Stage::Metadata,
            elapsed_ms: metadata_ms,
        });
        trace.stages.push(StageTiming {
            stage: Stage::Vision,
            elapsed_ms: vision_ms,
        });
        trace.record_attempts(vision_attempts);

        let metadata = match metadata {
            Ok(metadata) => metadata,
            Err(e) => return Self::unreadable(asset, e, context, asset_fingerprint, trace, started),
        };
        let gps = metadata.location.as_ref().map(|l| l.coordinates());

        let location = match gps {
            Some(coordinates) => {
                let stage_started = Instant::now();
                let (resolution, attempts) = self.resolver.resolve(coordinates).await;
                trace.record_stage(Stage::Geocoding, stage_started);
                trace.record_attempts(attempts);
                Some(resolution)
            }
            None => {
                debug!(asset = asset.name(), "No GPS position in metadata, skipping location resolution");
                None
            }
        };

        let market = match Self::search_center(gps, context) {
            Some(center) if self.market.has_sources() => {
                let criteria = SearchCriteria {
                    property_type: context.property_type.clone(),
                    price_range: context.price_range,
                    area_range: context.area_range,
                    ..SearchCriteria::around(center, self.search_radius_m)
                };
                let stage_started = Instant::now();
                let (market, attempts) = self.market.search(&criteria, Utc::now()).await;
                trace.record_stage(Stage::Listings, stage_started);
                trace.record_attempts(attempts);
                market
            }
            Some(_) => {
                debug!("No listing sources configured, skipping market search");
                None
            }
            None => {
                debug!("No coordinates available, skipping market search");
                None
            }
        };
        let (market_snapshot, comparables) =
            market.map_or((None, Vec::new()), |m| (Some(m.snapshot), m.comparables));

        let synthesis_started = Instant::now();
        let synthesis = synthesize(&SynthesisInput {
            metadata: Some(&metadata),
            location: location.as_ref(),
            snapshot: market_snapshot.as_ref(),
            comparables: &comparables,
            visual: Some(&visual),
            estimated_value: context.estimated_value,
            now: Utc::now(),
        });
        trace.record_stage(Stage::Synthesis, synthesis_started);

        let processing_time_ms = elapsed_ms(started);
        info!(
            asset = asset.name(),
            elapsed_ms = processing_time_ms,
            vision_provider = %visual.provider,
            comparables = comparables.len(),
            recommendations = synthesis.recommendations.len(),
            "Analysis complete"
        );

        AnalysisReport {
            metadata: Some(metadata),
            location,
            market_snapshot,
            comparables,
            comparable_summary: synthesis.comparable_summary,
            visual_analysis: visual,
            contextual_analysis: synthesis.contextual_analysis,
            recommendations: synthesis.recommendations,
            success: true,
            error: None,
            processing_time_ms,
            asset_fingerprint,
            trace,
            generated_at: Utc::now(),
        }
    }

    /// GPS wins over caller-supplied coordinates. Invalid positions count as
    /// absent.
    fn search_center(gps: Option<Coordinates>, context: &PropertyContext) -> Option<Coordinates> {
        gps.or(context.coordinates).filter(Coordinates::is_valid)
    }

    /// Report for an asset that is not a readable image. No provider is
    /// contacted on this path.
    fn unreadable(
        asset: &ImageAsset,
        cause: MetadataError,
        context: &PropertyContext,
        asset_fingerprint: String,
        mut trace: PipelineTrace,
        started: Instant,
    ) -> AnalysisReport {
        let cause = AnalyzerError::from(cause);
        error!(asset = asset.name(), size = asset.size(), error = %cause, "Asset could not be analyzed");

        let visual = heuristic_analysis(asset, Vec::new());
        let synthesis_started = Instant::now();
        let synthesis = synthesize(&SynthesisInput {
            metadata: None,
            location: None,
            snapshot: None,
            comparables: &[],
            visual: Some(&visual),
            estimated_value: context.estimated_value,
            now: Utc::now(),
        });
        trace.record_stage(Stage::Synthesis, synthesis_started);

        let contextual_analysis = format!(
            "## Analysis incomplete\n{cause}. Capture details, location and market data are unavailable; \
             only an estimate based on the file name and size follows.\n{}",
            synthesis.contextual_analysis
        );

        AnalysisReport {
            metadata: None,
            location: None,
            market_snapshot: None,
            comparables: Vec::new(),
            comparable_summary: None,
            visual_analysis: visual,
            contextual_analysis,
            recommendations: synthesis.recommendations,
            success: false,
            error: Some(cause.to_string()),
            processing_time_ms: elapsed_ms(started),
            asset_fingerprint,
            trace,
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fixtures::{exif_image, gps_fields, tiny_png};
    use crate::geo::mock::MockGeocoder;
    use crate::market::mock::MockListings;
    use crate::structs::ValueRange;
    use crate::synthesis::structs::RecommendationType;
    use crate::vision::heuristic::HEURISTIC_PROVIDER;
    use crate::vision::mock::MockVision;

    const LAT: f64 = -23.561;
    const LON: f64 = -46.656;

    fn geotagged() -> ImageAsset {
        exif_image("fachada.tif", &gps_fields(LAT, LON))
    }

    fn geocoders(mocks: &[Arc<MockGeocoder>]) -> Vec<Arc<dyn GeocodingProvider>> {
        mocks
            .iter()
            .map(|m| Arc::clone(m) as Arc<dyn GeocodingProvider>)
            .collect()
    }

    fn three_sources() -> Vec<Arc<dyn ListingSource>> {
        [
            MockListings::new("portal-a", 5, 500_000.0),
            MockListings::new("portal-b", 5, 600_000.0),
            MockListings::new("portal-c", 5, 700_000.0),
        ]
        .into_iter()
        .map(|m| m as Arc<dyn ListingSource>)
        .collect()
    }

    fn vision(mock: &Arc<MockVision>) -> Vec<Arc<dyn VisionProvider>> {
        vec![Arc::clone(mock) as Arc<dyn VisionProvider>]
    }

    #[test]
    fn test_rejects_bad_configuration() {
        let radius = PropertyAnalyzer::builder()
            .offline_fallback(false)
            .search_radius_m(0.0)
            .build();
        assert!(matches!(radius, Err(AnalyzerError::Config(_))));

        let top = PropertyAnalyzer::builder()
            .offline_fallback(false)
            .top_comparables(0)
            .build();
        assert!(matches!(top, Err(AnalyzerError::Config(_))));
    }

    #[tokio::test]
    async fn test_no_gps_never_calls_geocoders() {
        let google = MockGeocoder::answering("google", "Av. Paulista, São Paulo", 0.95);
        let analyzer = PropertyAnalyzer::builder()
            .geocoders(geocoders(&[google.clone()]))
            .offline_fallback(false)
            .listing_sources(three_sources())
            .build()
            .unwrap();

        let report = analyzer
            .analyze(&tiny_png("sala.png"), None, &PropertyContext::default())
            .await;

        assert!(report.success);
        assert_eq!(google.call_count(), 0);
        assert!(report.location.is_none());
        assert!(report.market_snapshot.is_none());
        assert!(report.trace.providers_for(Stage::Geocoding).is_empty());
        assert!(report.metadata.unwrap().location.is_none());
    }

    #[tokio::test]
    async fn test_all_geocoders_failing_degrades_location() {
        let analyzer = PropertyAnalyzer::builder()
            .geocoders(geocoders(&[
                MockGeocoder::failing("google"),
                MockGeocoder::failing("nominatim"),
            ]))
            .offline_fallback(false)
            .build()
            .unwrap();

        let report = analyzer
            .analyze(&geotagged(), None, &PropertyContext::default())
            .await;

        assert!(report.success);
        let location = report.location.unwrap();
        assert!(location.degraded);
        assert!(location.confidence <= 0.1);
        assert!((location.coordinates.latitude - LAT).abs() < 1e-4);
        assert!((location.coordinates.longitude - LON).abs() < 1e-4);
        assert_eq!(report.trace.providers_for(Stage::Geocoding), ["google", "nominatim"]);
    }

    #[tokio::test]
    async fn test_no_vision_provider_uses_heuristic() {
        let analyzer = PropertyAnalyzer::builder()
            .offline_fallback(false)
            .build()
            .unwrap();

        let report = analyzer
            .analyze(&tiny_png("cozinha.png"), None, &PropertyContext::default())
            .await;

        assert!(report.success);
        assert_eq!(report.visual_analysis.provider, HEURISTIC_PROVIDER);
        assert!(report.visual_analysis.degraded);
        assert!(
            report
                .recommendations
                .iter()
                .any(|r| r.kind == RecommendationType::Visual)
        );
    }

    #[tokio::test]
    async fn test_full_run_with_every_stage() {
        let google = MockGeocoder::answering("google", "Av. Paulista, 1000 - São Paulo, SP", 0.95);
        let openai = MockVision::answering("openai", "Bright living room with wooden floors.");
        let analyzer = PropertyAnalyzer::builder()
            .geocoders(geocoders(&[google.clone()]))
            .offline_fallback(false)
            .listing_sources(three_sources())
            .vision_providers(vision(&openai))
            .top_comparables(10)
            .build()
            .unwrap();

        let report = analyzer
            .analyze(&geotagged(), Some("Describe the facade."), &PropertyContext::default())
            .await;

        assert!(report.success);
        assert!(report.error.is_none());
        assert_eq!(google.call_count(), 1);
        assert_eq!(openai.call_count(), 1);
        assert_eq!(report.location.as_ref().unwrap().provider, "google");

        let snapshot = report.market_snapshot.as_ref().unwrap();
        assert_eq!(snapshot.total_properties, 15);
        assert_eq!(snapshot.by_source.len(), 3);
        assert_eq!(report.comparables.len(), 10);
        assert_eq!(report.comparable_summary.unwrap().count, 10);

        assert_eq!(report.visual_analysis.provider, "openai");
        assert!(report.contextual_analysis.contains("## Location"));
        assert!(report.contextual_analysis.contains("## Market"));
        assert!(report.contextual_analysis.contains("Bright living room with wooden floors."));
        assert_eq!(report.asset_fingerprint.len(), 64);

        let stages: Vec<Stage> = report.trace.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            [
                Stage::Metadata,
                Stage::Vision,
                Stage::Geocoding,
                Stage::Listings,
                Stage::Synthesis
            ]
        );
    }

    #[tokio::test]
    async fn test_pricing_note_only_for_large_deviation() {
        let analyzer = PropertyAnalyzer::builder()
            .offline_fallback(false)
            .listing_sources(three_sources())
            .build()
            .unwrap();
        let asset = geotagged();

        // Market average over all 15 listings is 620 000.
        let overpriced = PropertyContext {
            estimated_value: Some(900_000.0),
            ..PropertyContext::default()
        };
        let report = analyzer.analyze(&asset, None, &overpriced).await;
        assert!(
            report
                .recommendations
                .iter()
                .any(|r| r.kind == RecommendationType::Pricing)
        );

        let fair = PropertyContext {
            estimated_value: Some(650_000.0),
            ..PropertyContext::default()
        };
        let report = analyzer.analyze(&asset, None, &fair).await;
        assert!(
            !report
                .recommendations
                .iter()
                .any(|r| r.kind == RecommendationType::Pricing)
        );
    }

    #[tokio::test]
    async fn test_context_coordinates_enable_market_without_gps() {
        let google = MockGeocoder::answering("google", "Av. Paulista, São Paulo", 0.95);
        let analyzer = PropertyAnalyzer::builder()
            .geocoders(geocoders(&[google.clone()]))
            .offline_fallback(false)
            .listing_sources(three_sources())
            .build()
            .unwrap();
        let context = PropertyContext {
            coordinates: Some(Coordinates::new(LAT, LON)),
            price_range: Some(ValueRange::new(450_000.0, 750_000.0)),
            ..PropertyContext::default()
        };

        let report = analyzer.analyze(&tiny_png("sala.png"), None, &context).await;

        assert!(report.location.is_none());
        assert_eq!(google.call_count(), 0);
        assert_eq!(report.market_snapshot.unwrap().total_properties, 15);
    }

    #[tokio::test]
    async fn test_failing_source_keeps_the_others() {
        let sources: Vec<Arc<dyn ListingSource>> = vec![
            MockListings::new("portal-a", 5, 500_000.0),
            MockListings::failing("portal-b"),
        ];
        let analyzer = PropertyAnalyzer::builder()
            .offline_fallback(false)
            .listing_sources(sources)
            .build()
            .unwrap();

        let report = analyzer
            .analyze(&geotagged(), None, &PropertyContext::default())
            .await;

        assert!(report.success);
        assert_eq!(report.market_snapshot.unwrap().total_properties, 5);
        assert!(
            report
                .trace
                .attempts
                .iter()
                .any(|a| a.provider == "portal-b" && !a.succeeded)
        );
    }

    #[tokio::test]
    async fn test_unreadable_asset_still_yields_report() {
        let openai = MockVision::answering("openai", "unused");
        let analyzer = PropertyAnalyzer::builder()
            .offline_fallback(false)
            .vision_providers(vision(&openai))
            .build()
            .unwrap();
        let text = ImageAsset::new("notes.txt", "image/jpeg", b"just some notes".to_vec());

        let report = analyzer.analyze(&text, None, &PropertyContext::default()).await;

        assert!(!report.success);
        assert!(report.error.as_deref().unwrap().contains("notes.txt"));
        assert_eq!(openai.call_count(), 0);
        assert!(report.visual_analysis.degraded);
        assert!(report.metadata.is_none());
        assert!(report.contextual_analysis.starts_with("## Analysis incomplete"));
        assert!(report.contextual_analysis.contains("## Visual analysis"));
    }

    #[tokio::test]
    async fn test_empty_asset() {
        let analyzer = PropertyAnalyzer::builder()
            .offline_fallback(false)
            .build()
            .unwrap();
        let report = analyzer
            .analyze(&ImageAsset::new("empty.jpg", "image/jpeg", Vec::new()), None, &PropertyContext::default())
            .await;
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("Unreadable asset: Image asset is empty"));
    }
}
