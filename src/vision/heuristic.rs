//! Deterministic stand-in for a visual analysis. Looks only at the file name
//! and size, never at pixels.

use crate::structs::ImageAsset;
use crate::vision::structs::{AreaType, ResolutionTier, VisualAnalysisResult};
use regex::Regex;
use std::sync::LazyLock;

pub const HEURISTIC_PROVIDER: &str = "local-heuristic";
pub const HEURISTIC_CONFIDENCE: f64 = 0.3;

const HIGH_RESOLUTION_BYTES: usize = 2 * 1024 * 1024;
const MEDIUM_RESOLUTION_BYTES: usize = 500 * 1024;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{L}+").expect("valid word pattern"));

const KEYWORDS: &[(AreaType, &[&str])] = &[
    (
        AreaType::Facade,
        &["façade", "facade", "fachada", "exterior", "front", "frente"],
    ),
    (AreaType::LivingRoom, &["living", "sala", "lounge"]),
    (
        AreaType::Bedroom,
        &["bedroom", "quarto", "suite", "dormitorio", "dormitório"],
    ),
    (AreaType::Kitchen, &["kitchen", "cozinha"]),
    (
        AreaType::Bathroom,
        &["bathroom", "bath", "banheiro", "lavabo", "wc"],
    ),
    (AreaType::Garage, &["garage", "garagem"]),
    (AreaType::Pool, &["pool", "piscina"]),
    (AreaType::Garden, &["garden", "jardim", "quintal", "backyard"]),
];

fn tokens(name: &str) -> Vec<String> {
    let lower = name.to_lowercase();
    WORD.find_iter(&lower).map(|m| m.as_str().to_string()).collect()
}

/// First keyword match in the file name, in table order.
#[must_use]
pub fn guess_area(name: &str) -> Option<AreaType> {
    let tokens = tokens(name);
    KEYWORDS
        .iter()
        .find(|(_, words)| tokens.iter().any(|t| words.contains(&t.as_str())))
        .map(|(area, _)| *area)
}

#[must_use]
pub const fn resolution_tier(size: usize) -> ResolutionTier {
    if size > HIGH_RESOLUTION_BYTES {
        ResolutionTier::High
    } else if size > MEDIUM_RESOLUTION_BYTES {
        ResolutionTier::Medium
    } else {
        ResolutionTier::Low
    }
}

#[allow(clippy::cast_precision_loss)]
fn describe_size(size: usize) -> String {
    if size >= 1024 * 1024 {
        format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.0} KB", size as f64 / 1024.0)
    }
}

/// Always succeeds. The result is flagged as degraded.
#[must_use]
pub fn heuristic_analysis(asset: &ImageAsset, mut attempted_providers: Vec<String>) -> VisualAnalysisResult {
    let area = guess_area(asset.name());
    let tier = resolution_tier(asset.size());

    let mut analysis = String::from(
        "Automatic visual analysis was unavailable; this summary is based on the file name and size only.\n",
    );
    match area {
        Some(area) => analysis.push_str(&format!(
            "Probable area: {} (from the file name).\n",
            area.label()
        )),
        None => analysis.push_str("Area type could not be inferred from the file name.\n"),
    }
    let quality = match tier {
        ResolutionTier::High => "high resolution, suitable for detailed inspection",
        ResolutionTier::Medium => "medium resolution",
        ResolutionTier::Low => "low resolution, details may not be visible",
    };
    analysis.push_str(&format!(
        "Image size: {} ({quality}).\n",
        describe_size(asset.size())
    ));
    analysis.push_str(
        "Condition, finishes and state of conservation were not assessed. Review the photo manually.",
    );

    attempted_providers.push(HEURISTIC_PROVIDER.to_string());

    VisualAnalysisResult {
        provider: HEURISTIC_PROVIDER.to_string(),
        analysis,
        confidence: HEURISTIC_CONFIDENCE,
        degraded: true,
        attempted_providers,
    }
}
