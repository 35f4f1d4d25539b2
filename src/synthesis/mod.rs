//! Merges the partial results of a run into a narrative and recommendations.
mod narrative;
pub mod recommendations;
pub mod structs;
pub mod sun;

use crate::capture::structs::CaptureMetadata;
use crate::geo::structs::LocationResolution;
use crate::market::structs::{MarketSnapshot, PropertyListing};
use crate::synthesis::recommendations::{RuleInputs, recommend};
use crate::synthesis::structs::{ComparableSummary, Synthesis};
use crate::vision::structs::VisualAnalysisResult;
use chrono::{DateTime, Utc};

/// Whatever the earlier stages produced. Any field may be missing.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInput<'a> {
    pub metadata: Option<&'a CaptureMetadata>,
    pub location: Option<&'a LocationResolution>,
    pub snapshot: Option<&'a MarketSnapshot>,
    pub comparables: &'a [PropertyListing],
    pub visual: Option<&'a VisualAnalysisResult>,
    pub estimated_value: Option<f64>,
    pub now: DateTime<Utc>,
}

#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn summarize_comparables(
    comparables: &[PropertyListing],
    estimated_value: Option<f64>,
) -> Option<ComparableSummary> {
    if comparables.is_empty() {
        return None;
    }
    let count = comparables.len();
    let mean_price = comparables.iter().map(|l| l.price).sum::<f64>() / count as f64;
    let mean_area = comparables.iter().map(|l| l.area).sum::<f64>() / count as f64;
    let deviation_percent = estimated_value
        .filter(|_| mean_price > 0.0)
        .map(|estimated| (estimated - mean_price) / mean_price * 100.0);

    Some(ComparableSummary {
        count,
        mean_price,
        mean_area,
        deviation_percent,
    })
}

/// Builds every section whose input exists. Missing inputs only drop their
/// own section.
#[must_use]
pub fn synthesize(input: &SynthesisInput<'_>) -> Synthesis {
    let comparable_summary = summarize_comparables(input.comparables, input.estimated_value);

    let sections: Vec<String> = [
        input.location.map(narrative::location_section),
        input
            .metadata
            .and_then(|m| narrative::capture_section(m, input.now)),
        input.snapshot.map(narrative::market_section),
        comparable_summary
            .as_ref()
            .map(|s| narrative::comparables_section(s, input.estimated_value)),
        input.visual.map(narrative::visual_section),
    ]
    .into_iter()
    .flatten()
    .collect();

    let contextual_analysis = if sections.is_empty() {
        "No contextual information could be derived from this image.".to_string()
    } else {
        sections.join("\n")
    };

    let recommendations = recommend(&RuleInputs {
        estimated_value: input.estimated_value,
        snapshot: input.snapshot,
        comparables: input.comparables,
        location: input.location,
        visual: input.visual,
    });

    Synthesis {
        contextual_analysis,
        recommendations,
        comparable_summary,
    }
}
