use crate::error::ProviderError;
use crate::fallback::{Named, ProviderAttempt, Stage, first_success};
use crate::structs::ImageAsset;
use crate::vision::heuristic::heuristic_analysis;
use crate::vision::structs::{VisionAnswer, VisualAnalysisResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Used when the caller gives no instruction of their own.
pub const DEFAULT_INSTRUCTION: &str = "You are a real-estate appraiser. Describe the property shown in this photo: \
the type of room or area, the overall condition, the quality of finishes and materials, \
the state of conservation, and any visible defects or features that affect market value.";

/// "Given an image and an instruction, return free text and a confidence."
#[async_trait]
pub trait VisionProvider: Named + Send + Sync {
    async fn analyze(&self, asset: &ImageAsset, instruction: &str) -> Result<VisionAnswer, ProviderError>;
}

/// Walks the vision providers in priority order and falls back to the local
/// heuristic when none answers. Always produces exactly one result.
pub struct VisualAnalysisOrchestrator {
    providers: Vec<Arc<dyn VisionProvider>>,
    timeout: Duration,
    overload_retries: u32,
    overload_retry_delay: Duration,
}

impl VisualAnalysisOrchestrator {
    #[must_use]
    pub fn new(
        providers: Vec<Arc<dyn VisionProvider>>,
        timeout: Duration,
        overload_retries: u32,
        overload_retry_delay: Duration,
    ) -> Self {
        Self {
            providers,
            timeout,
            overload_retries,
            overload_retry_delay,
        }
    }

    /// Retries a provider only while it reports being overloaded. Any other
    /// error is returned immediately.
    async fn call_with_retry(
        &self,
        provider: &dyn VisionProvider,
        asset: &ImageAsset,
        instruction: &str,
    ) -> Result<VisionAnswer, ProviderError> {
        let mut retries_left = self.overload_retries;
        loop {
            match provider.analyze(asset, instruction).await {
                Err(e) if e.is_overloaded() && retries_left > 0 => {
                    retries_left -= 1;
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        retries_left,
                        "Vision provider overloaded, retrying"
                    );
                    sleep(self.overload_retry_delay).await;
                }
                other => return other,
            }
        }
    }

    pub async fn analyze(
        &self,
        asset: &ImageAsset,
        instruction: Option<&str>,
    ) -> (VisualAnalysisResult, Vec<ProviderAttempt>) {
        let instruction = instruction
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_INSTRUCTION);

        let outcome = first_success(Stage::Vision, &self.providers, self.timeout, |provider| {
            self.call_with_retry(provider, asset, instruction)
        })
        .await;
        let attempted: Vec<String> = outcome.attempts.iter().map(|a| a.provider.clone()).collect();

        let result = match outcome.winner {
            Some(winner) => VisualAnalysisResult {
                provider: winner.provider,
                analysis: winner.value.analysis,
                confidence: winner.value.confidence.clamp(0.0, 1.0),
                degraded: false,
                attempted_providers: attempted,
            },
            None => {
                info!(
                    attempted = attempted.len(),
                    "No vision provider answered, using local heuristic"
                );
                heuristic_analysis(asset, attempted)
            }
        };
        (result, outcome.attempts)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Scripted = Result<VisionAnswer, fn() -> ProviderError>;

    /// Vision provider replaying a script of responses, one per call. The
    /// last response repeats once the script runs out.
    pub struct MockVision {
        pub name: &'static str,
        script: Mutex<VecDeque<Scripted>>,
        last: Scripted,
        pub calls: AtomicUsize,
    }

    fn overloaded() -> ProviderError {
        ProviderError::Overloaded("busy".to_string())
    }

    fn unauthorized() -> ProviderError {
        ProviderError::Unauthorized("bad key".to_string())
    }

    fn fail(make: fn() -> ProviderError) -> Scripted {
        Err(make)
    }

    fn answer(analysis: &str) -> Scripted {
        Ok(VisionAnswer {
            analysis: analysis.to_string(),
            confidence: 0.85,
        })
    }

    impl MockVision {
        fn scripted(name: &'static str, script: Vec<Scripted>) -> Arc<Self> {
            let last = script.last().cloned().unwrap_or_else(|| fail(unauthorized));
            Arc::new(Self {
                name,
                script: Mutex::new(script.into()),
                last,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn answering(name: &'static str, analysis: &str) -> Arc<Self> {
            Self::scripted(name, vec![answer(analysis)])
        }

        pub fn unauthorized(name: &'static str) -> Arc<Self> {
            Self::scripted(name, vec![fail(unauthorized)])
        }

        pub fn overloaded(name: &'static str) -> Arc<Self> {
            Self::scripted(name, vec![fail(overloaded)])
        }

        pub fn overloaded_then_answering(name: &'static str, analysis: &str) -> Arc<Self> {
            Self::scripted(name, vec![fail(overloaded), answer(analysis)])
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Named for MockVision {
        fn name(&self) -> &str {
            self.name
        }
    }

    #[async_trait]
    impl VisionProvider for MockVision {
        async fn analyze(&self, _: &ImageAsset, _: &str) -> Result<VisionAnswer, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.last.clone());
            next.map_err(|make| make())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockVision;
    use super::*;
    use crate::vision::heuristic::HEURISTIC_PROVIDER;

    fn asset() -> ImageAsset {
        ImageAsset::new("sala_estar.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
    }

    fn orchestrator(providers: Vec<Arc<MockVision>>) -> VisualAnalysisOrchestrator {
        let providers = providers
            .into_iter()
            .map(|p| p as Arc<dyn VisionProvider>)
            .collect();
        VisualAnalysisOrchestrator::new(providers, Duration::from_secs(1), 2, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_first_answer_wins() {
        let first = MockVision::answering("openai", "Bright living room");
        let second = MockVision::answering("gemini", "unused");
        let o = orchestrator(vec![first.clone(), second.clone()]);

        let (result, attempts) = o.analyze(&asset(), None).await;

        assert_eq!(result.provider, "openai");
        assert_eq!(result.analysis, "Bright living room");
        assert!(!result.degraded);
        assert_eq!(result.attempted_providers, ["openai"]);
        assert_eq!(attempts.len(), 1);
        assert_eq!(second.call_count(), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_falls_through_without_retry() {
        let broken = MockVision::unauthorized("openai");
        let backup = MockVision::answering("gemini", "Kitchen in good condition");
        let o = orchestrator(vec![broken.clone(), backup]);

        let (result, _) = o.analyze(&asset(), Some("Describe the kitchen")).await;

        assert_eq!(result.provider, "gemini");
        assert_eq!(result.attempted_providers, ["openai", "gemini"]);
        assert_eq!(broken.call_count(), 1);
    }

    #[tokio::test]
    async fn test_overload_is_retried() {
        let flaky = MockVision::overloaded_then_answering("openai", "Recovered");
        let o = orchestrator(vec![flaky.clone()]);

        let (result, _) = o.analyze(&asset(), None).await;

        assert_eq!(result.provider, "openai");
        assert_eq!(flaky.call_count(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let busy = MockVision::overloaded("openai");
        let o = orchestrator(vec![busy.clone()]);

        let (result, _) = o.analyze(&asset(), None).await;

        assert_eq!(busy.call_count(), 3);
        assert_eq!(result.provider, HEURISTIC_PROVIDER);
    }

    #[tokio::test]
    async fn test_no_providers_uses_heuristic() {
        let (result, attempts) = orchestrator(Vec::new()).analyze(&asset(), None).await;

        assert_eq!(result.provider, HEURISTIC_PROVIDER);
        assert!(result.degraded);
        assert!((result.confidence - 0.3).abs() < f64::EPSILON);
        assert!(result.analysis.contains("living room"));
        assert!(attempts.is_empty());
    }
}
