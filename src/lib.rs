//! # Property Analyzer
//!
//! Turn a single property photograph into a structured appraisal report.
//!
//! This crate runs one photo through a pipeline of independent stages and
//! merges whatever each stage manages to produce into a single
//! [`AnalysisReport`]. External providers (geocoders, listing feeds, vision
//! models) are tried in order or in parallel; any of them may fail without
//! failing the analysis.
//!
//! ## Key Features
//!
//! - **Capture Metadata**: GPS position, capture time with timezone, camera and exposure settings from EXIF.
//! - **Location**: Reverse geocoding through a provider chain with an offline GeoNames fallback.
//! - **Comparable Market**: Concurrent listing search, de-duplication, relevance ranking and market statistics.
//! - **Visual Analysis**: Vision model chain with overload retries and a local heuristic fallback.
//! - **Synthesis**: A readable contextual report and prioritized recommendations.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use property_analyzer::{ImageAsset, PropertyContext, ProviderSettings};
//!
//! #[tokio::main]
//! async fn main() -> color_eyre::Result<()> {
//!     let analyzer = ProviderSettings::from_env().build_analyzer()?;
//!
//!     let bytes = std::fs::read("assets/living_room.jpg")?;
//!     let photo = ImageAsset::new("living_room.jpg", "image/jpeg", bytes);
//!     let context = PropertyContext {
//!         estimated_value: Some(850_000.0),
//!         ..PropertyContext::default()
//!     };
//!
//!     let report = analyzer.analyze(&photo, None, &context).await;
//!
//!     println!("{}", report.contextual_analysis);
//!     for recommendation in &report.recommendations {
//!         println!("[{:?}] {}", recommendation.priority, recommendation.title);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod capture;
mod error;
pub mod fallback;
pub mod geo;
pub mod market;
mod property_analyzer;
mod settings;
mod structs;
pub mod synthesis;
pub mod vision;

pub use error::{AnalyzerError, MetadataError, ProviderError};
pub use property_analyzer::PropertyAnalyzer;
pub use settings::ProviderSettings;
pub use structs::{AnalysisReport, ImageAsset, PropertyContext, ValueRange};
