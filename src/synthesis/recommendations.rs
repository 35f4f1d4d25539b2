use crate::geo::structs::LocationResolution;
use crate::market::structs::{MarketSnapshot, PropertyListing};
use crate::synthesis::structs::{Priority, Recommendation, RecommendationType};
use crate::vision::structs::VisualAnalysisResult;

const OVERPRICED_RATIO: f64 = 1.2;
const UNDERPRICED_RATIO: f64 = 0.8;
const STRONG_LOCATION_CONFIDENCE: f64 = 0.8;
const STRONG_COMPARABLE_SCORE: f64 = 70.0;
const COMPETITIVE_MARKET_COUNT: usize = 5;

/// Everything the recommendation rules look at. Each rule only fires when
/// its own inputs are present.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleInputs<'a> {
    pub estimated_value: Option<f64>,
    pub snapshot: Option<&'a MarketSnapshot>,
    pub comparables: &'a [PropertyListing],
    pub location: Option<&'a LocationResolution>,
    pub visual: Option<&'a VisualAnalysisResult>,
}

fn recommendation(
    kind: RecommendationType,
    priority: Priority,
    title: &str,
    description: String,
    suggestion: &str,
) -> Recommendation {
    Recommendation {
        kind,
        priority,
        title: title.to_string(),
        description,
        suggestion: suggestion.to_string(),
    }
}

fn pricing(inputs: &RuleInputs<'_>) -> Option<Recommendation> {
    let estimated = inputs.estimated_value?;
    let average = inputs.snapshot?.price?.average;
    if average <= 0.0 {
        return None;
    }
    let ratio = estimated / average;
    let deviation = (ratio - 1.0) * 100.0;

    if ratio > OVERPRICED_RATIO {
        Some(recommendation(
            RecommendationType::Pricing,
            Priority::High,
            "Review pricing",
            format!(
                "The estimated value of {estimated:.0} is {deviation:.1}% above the local market average of {average:.0}."
            ),
            "Re-check the valuation against the comparables or justify the premium with documented differentiators.",
        ))
    } else if ratio < UNDERPRICED_RATIO {
        Some(recommendation(
            RecommendationType::Pricing,
            Priority::Medium,
            "Possible buying opportunity",
            format!(
                "The estimated value of {estimated:.0} is {:.1}% below the local market average of {average:.0}.",
                deviation.abs()
            ),
            "Confirm the property's condition and documentation; if they hold up, the price is attractive.",
        ))
    } else {
        None
    }
}

fn location(inputs: &RuleInputs<'_>) -> Option<Recommendation> {
    let location = inputs.location?;
    (!location.degraded && location.confidence > STRONG_LOCATION_CONFIDENCE).then(|| {
        recommendation(
            RecommendationType::Location,
            Priority::Low,
            "Highlight the location",
            format!(
                "The address {} was confirmed with {:.0}% confidence.",
                location.formatted_address,
                location.confidence * 100.0
            ),
            "Use the precise location and nearby amenities as a selling point in marketing material.",
        )
    })
}

fn market(inputs: &RuleInputs<'_>) -> Option<Recommendation> {
    let strong = inputs
        .comparables
        .iter()
        .filter(|l| l.relevance_score.is_some_and(|s| s > STRONG_COMPARABLE_SCORE))
        .count();
    (strong > COMPETITIVE_MARKET_COUNT).then(|| {
        recommendation(
            RecommendationType::Market,
            Priority::Medium,
            "Competitive market",
            format!("{strong} closely matching properties are on offer nearby."),
            "Differentiate the listing with quality photos, a clear description and competitive terms.",
        )
    })
}

fn visual(inputs: &RuleInputs<'_>) -> Option<Recommendation> {
    inputs.visual.filter(|v| v.degraded).map(|v| {
        recommendation(
            RecommendationType::Visual,
            Priority::Low,
            "Photo analysis unavailable",
            format!(
                "No AI vision provider produced an analysis; only a {} estimate is available.",
                v.provider
            ),
            "Retry later or inspect the photo manually to assess condition and finishes.",
        )
    })
}

/// Applies every rule independently. The result is ordered high, medium,
/// low; rule order is kept within a priority.
#[must_use]
pub fn recommend(inputs: &RuleInputs<'_>) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = [pricing, location, market, visual]
        .iter()
        .filter_map(|rule| rule(inputs))
        .collect();
    recommendations.sort_by_key(|r| r.priority);
    recommendations
}
