//! Visual analysis through external AI providers with a local fallback.
pub mod heuristic;
mod orchestrator;
pub mod providers;
pub mod structs;

pub use orchestrator::{DEFAULT_INSTRUCTION, VisionProvider, VisualAnalysisOrchestrator};
#[cfg(test)]
pub(crate) use orchestrator::mock;
