//! Provider chains: "first success wins" and concurrent fan-out, plus the
//! per-invocation trace that records every attempt.

use crate::error::ProviderError;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Every provider adapter has a stable, human-readable name.
pub trait Named {
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Metadata,
    Geocoding,
    Listings,
    Vision,
    Synthesis,
}

/// Outcome of one provider call.
#[derive(Debug)]
pub enum Attempt<T> {
    Ok(T),
    Failed(String),
}

impl<T, E: Display> From<Result<T, E>> for Attempt<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAttempt {
    pub stage: Stage,
    pub provider: String,
    pub succeeded: bool,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed_ms: u64,
}

/// Timings and provider attempts of a single `analyze` call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTrace {
    pub stages: Vec<StageTiming>,
    pub attempts: Vec<ProviderAttempt>,
}

impl PipelineTrace {
    pub fn record_stage(&mut self, stage: Stage, started: Instant) {
        self.stages.push(StageTiming {
            stage,
            elapsed_ms: elapsed_ms(started),
        });
    }

    pub fn record_attempts(&mut self, attempts: impl IntoIterator<Item = ProviderAttempt>) {
        self.attempts.extend(attempts);
    }

    /// Providers contacted during `stage`, in call order.
    pub fn providers_for(&self, stage: Stage) -> Vec<&str> {
        self.attempts
            .iter()
            .filter(|a| a.stage == stage)
            .map(|a| a.provider.as_str())
            .collect()
    }
}

/// The value produced by the first provider that answered.
#[derive(Debug)]
pub struct Winner<T> {
    pub provider: String,
    pub value: T,
}

#[derive(Debug)]
pub struct FallbackOutcome<T> {
    pub winner: Option<Winner<T>>,
    pub attempts: Vec<ProviderAttempt>,
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Bounds a provider call; an elapsed deadline counts as a provider failure.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(ProviderError::Timeout(limit)))
}

async fn attempt<T, Fut>(
    stage: Stage,
    name: &str,
    limit: Duration,
    call: Fut,
) -> (Attempt<T>, ProviderAttempt)
where
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let started = Instant::now();
    debug!(stage = ?stage, provider = %name, "Calling provider");
    let outcome = Attempt::from(with_timeout(limit, call).await);
    let elapsed_ms = elapsed_ms(started);
    let error = match &outcome {
        Attempt::Ok(_) => None,
        Attempt::Failed(reason) => {
            warn!(stage = ?stage, provider = %name, error = %reason, elapsed_ms, "Provider failed");
            Some(reason.clone())
        }
    };
    let record = ProviderAttempt {
        stage,
        provider: name.to_string(),
        succeeded: error.is_none(),
        error,
        elapsed_ms,
    };
    (outcome, record)
}

/// Tries each provider in order and stops at the first one that succeeds.
/// Providers are awaited one at a time, so later providers are never called
/// when an earlier one answers.
pub async fn first_success<'p, P, T, F, Fut>(
    stage: Stage,
    providers: &'p [Arc<P>],
    limit: Duration,
    mut call: F,
) -> FallbackOutcome<T>
where
    P: Named + ?Sized,
    F: FnMut(&'p P) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempts = Vec::with_capacity(providers.len());
    for provider in providers {
        let (outcome, record) =
            attempt(stage, provider.name(), limit, call(provider.as_ref())).await;
        let provider_name = record.provider.clone();
        attempts.push(record);
        if let Attempt::Ok(value) = outcome {
            info!(stage = ?stage, provider = %provider_name, "Provider answered");
            return FallbackOutcome {
                winner: Some(Winner {
                    provider: provider_name,
                    value,
                }),
                attempts,
            };
        }
    }
    FallbackOutcome {
        winner: None,
        attempts,
    }
}

/// Calls every provider sequentially and keeps all successful answers.
pub async fn all_successes<'p, P, T, F, Fut>(
    stage: Stage,
    providers: &'p [Arc<P>],
    limit: Duration,
    mut call: F,
) -> (Vec<Winner<T>>, Vec<ProviderAttempt>)
where
    P: Named + ?Sized,
    F: FnMut(&'p P) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut winners = Vec::new();
    let mut attempts = Vec::with_capacity(providers.len());
    for provider in providers {
        let (outcome, record) =
            attempt(stage, provider.name(), limit, call(provider.as_ref())).await;
        if let Attempt::Ok(value) = outcome {
            winners.push(Winner {
                provider: record.provider.clone(),
                value,
            });
        }
        attempts.push(record);
    }
    (winners, attempts)
}

/// Queries every provider concurrently. A failing or slow provider only
/// loses its own slot and never cancels the others.
pub async fn fan_out<'p, P, T, F, Fut>(
    stage: Stage,
    providers: &'p [Arc<P>],
    limit: Duration,
    call: F,
) -> (Vec<Winner<T>>, Vec<ProviderAttempt>)
where
    P: Named + ?Sized,
    F: Fn(&'p P) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let calls = providers
        .iter()
        .map(|provider| attempt(stage, provider.name(), limit, call(provider.as_ref())));

    let mut winners = Vec::new();
    let mut attempts = Vec::with_capacity(providers.len());
    for (outcome, record) in join_all(calls).await {
        if let Attempt::Ok(value) = outcome {
            winners.push(Winner {
                provider: record.provider.clone(),
                value,
            });
        }
        attempts.push(record);
    }
    (winners, attempts)
}
