use serde::{Deserialize, Serialize};

/// What a vision provider returns before the orchestrator labels it.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionAnswer {
    pub analysis: String,
    pub confidence: f64,
}

/// The single visual analysis of a run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualAnalysisResult {
    pub provider: String,
    pub analysis: String,
    pub confidence: f64,
    /// `true` when no AI provider answered and the local heuristic was used.
    pub degraded: bool,
    /// Every provider contacted, in order, including the winner.
    pub attempted_providers: Vec<String>,
}

/// Room or area guessed from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaType {
    Facade,
    LivingRoom,
    Bedroom,
    Kitchen,
    Bathroom,
    Garage,
    Pool,
    Garden,
}

impl AreaType {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Facade => "façade / exterior",
            Self::LivingRoom => "living room",
            Self::Bedroom => "bedroom",
            Self::Kitchen => "kitchen",
            Self::Bathroom => "bathroom",
            Self::Garage => "garage",
            Self::Pool => "pool area",
            Self::Garden => "garden / outdoor area",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    High,
    Medium,
    Low,
}
