//! The dispatch cascade
//!
//! Tries ranked candidates in order. Each attempt consults the cache,
//! probes locally hosted backends, issues at most one generation call
//! under a bounded timeout, classifies the outcome, and either serves
//! the result, advances to the next candidate, or falls back to the
//! templated offline study pack. Every transition is recorded in the
//! attempt trace returned with the result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lectern_cache::{CachedAnswer, ResponseCache};
use lectern_config::AccessibilityClass;
use lectern_core::{AttemptOutcome, AttemptRecord, RequestContext};
use lectern_llm::fallback::{FALLBACK_MODEL, FALLBACK_PROVIDER, study_pack};
use lectern_llm::provider::GenerationRequest;
use lectern_llm::{HealthProbe, Provider, ProviderError};
use lectern_routing::{Classification, ProviderRegistry, ScoredCandidate};
use lectern_validate::Validator;
use thiserror::Error;

/// Attempt budget for same-host backends
pub const LOCAL_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Attempt budget for networked backends
pub const NETWORK_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Budget for the pre-attempt reachability probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Terminal dispatch failures
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The candidate list was empty; nothing could be attempted
    #[error("no providers are configured to serve this request")]
    RegistryExhausted,

    /// The caller abandoned the request mid-dispatch
    #[error("request cancelled by the caller")]
    Cancelled,
}

/// Everything the cascade needs for one request
#[derive(Debug, Clone, Copy)]
pub struct DispatchRequest<'a> {
    /// Ranked candidates, best first
    pub candidates: &'a [ScoredCandidate],
    /// Classification of the raw question
    pub classification: &'a Classification,
    /// Cache fingerprint of the augmented request
    pub fingerprint: &'a str,
    /// Fully augmented prompt sent to backends
    pub prompt: &'a str,
    /// Caller-requested model, descriptor default when absent
    pub model_override: Option<&'a str>,
    /// Sampling temperature forwarded to the backend
    pub temperature: Option<f64>,
    /// Output token budget forwarded to the backend
    pub max_tokens: Option<u32>,
}

/// A served answer with its dispatch metadata
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Answer text, always usable
    pub content: String,
    /// Backend (or fallback generator) that served it
    pub provider: String,
    /// Model that served it
    pub model: String,
    /// Why this provider was chosen
    pub selection_reason: String,
    /// Backend attempted before the fallback served, if any
    pub fallback_from: Option<String>,
    /// Validation score of the served content, absent for cache hits
    /// and fallback packs
    pub validation_score: Option<u8>,
    /// Per-attempt trace
    pub trace: Vec<AttemptRecord>,
}

/// Executes the cascade against registered backends
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    backends: HashMap<String, Arc<dyn Provider>>,
    probes: HashMap<String, Arc<dyn HealthProbe>>,
    timeouts: HashMap<String, Duration>,
    cache: Arc<ResponseCache>,
    validator: Validator,
}

impl Dispatcher {
    /// Dispatcher with no backends registered yet
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>, cache: Arc<ResponseCache>, validator: Validator) -> Self {
        Self {
            registry,
            backends: HashMap::new(),
            probes: HashMap::new(),
            timeouts: HashMap::new(),
            cache,
            validator,
        }
    }

    /// Register (or replace) the backend implementation for a provider
    pub fn insert_backend(&mut self, name: &str, backend: Arc<dyn Provider>) {
        self.backends.insert(name.to_owned(), backend);
    }

    /// Attach a reachability probe to a locally hosted provider
    pub fn insert_probe(&mut self, name: &str, probe: Arc<dyn HealthProbe>) {
        self.probes.insert(name.to_owned(), probe);
    }

    /// Override the attempt timeout for a provider
    pub fn set_timeout(&mut self, name: &str, timeout: Duration) {
        self.timeouts.insert(name.to_owned(), timeout);
    }

    fn attempt_timeout(&self, name: &str, local: bool) -> Duration {
        self.timeouts.get(name).copied().unwrap_or(if local {
            LOCAL_ATTEMPT_TIMEOUT
        } else {
            NETWORK_ATTEMPT_TIMEOUT
        })
    }

    /// Run the cascade for one request
    ///
    /// # Errors
    ///
    /// [`DispatchError::RegistryExhausted`] when `candidates` is empty,
    /// [`DispatchError::Cancelled`] when the caller aborts mid-attempt.
    /// Every other failure is absorbed into the trace and the fallback.
    #[allow(clippy::too_many_lines)]
    pub async fn dispatch(
        &self,
        request: DispatchRequest<'_>,
        context: &RequestContext,
    ) -> Result<DispatchOutcome, DispatchError> {
        if request.candidates.is_empty() {
            return Err(DispatchError::RegistryExhausted);
        }

        let mut trace = Vec::new();
        let mut last_attempted: Option<&ScoredCandidate> = None;

        for candidate in request.candidates {
            if context.cancellation.is_cancelled() {
                return Err(DispatchError::Cancelled);
            }

            let started = Instant::now();

            if let Some(cached) = self.cache.get(request.fingerprint) {
                trace.push(record(&candidate.provider, AttemptOutcome::CacheHit, started));
                tracing::debug!(provider = %cached.provider, "served from cache");
                return Ok(DispatchOutcome {
                    content: cached.content,
                    provider: cached.provider,
                    model: cached.model,
                    selection_reason: "served from cache".to_owned(),
                    fallback_from: None,
                    validation_score: Some(cached.score),
                    trace,
                });
            }

            let Ok(descriptor) = self.registry.get(&candidate.provider) else {
                tracing::warn!(provider = %candidate.provider, "ranked candidate missing from registry");
                trace.push(record(&candidate.provider, AttemptOutcome::Misconfigured, started));
                continue;
            };
            let Some(backend) = self.backends.get(&candidate.provider) else {
                tracing::warn!(provider = %candidate.provider, "ranked candidate has no backend");
                trace.push(record(&candidate.provider, AttemptOutcome::Misconfigured, started));
                continue;
            };
            let local = descriptor.accessibility == AccessibilityClass::Local;
            last_attempted = Some(candidate);

            // locally hosted backends are optionally absent, so check
            // reachability before committing the attempt budget
            if local && let Some(probe) = self.probes.get(&candidate.provider) {
                let reachable = tokio::select! {
                    () = context.cancellation.cancelled() => return Err(DispatchError::Cancelled),
                    reachable = probe.ping(PROBE_TIMEOUT) => reachable,
                };
                if !reachable {
                    self.registry.mark_unhealthy(&candidate.provider);
                    trace.push(record(&candidate.provider, AttemptOutcome::ProbeFailed, started));
                    continue;
                }
            }

            let generation_request = GenerationRequest {
                prompt: request.prompt.to_owned(),
                model: request
                    .model_override
                    .unwrap_or(&descriptor.default_model)
                    .to_owned(),
                temperature: request.temperature,
                max_tokens: request.max_tokens,
            };
            let budget = self.attempt_timeout(&candidate.provider, local);

            let result = tokio::select! {
                () = context.cancellation.cancelled() => return Err(DispatchError::Cancelled),
                result = tokio::time::timeout(budget, backend.generate(&generation_request, context)) => {
                    result.unwrap_or(Err(ProviderError::Timeout))
                }
            };

            match result {
                Ok(generation) => {
                    self.registry.mark_healthy(&candidate.provider);
                    let validation = self.validator.validate(&generation.content);
                    if validation.passed {
                        trace.push(record(&candidate.provider, AttemptOutcome::Success, started));
                        self.cache.put(
                            request.fingerprint.to_owned(),
                            CachedAnswer {
                                content: generation.content.clone(),
                                provider: candidate.provider.clone(),
                                model: generation.model.clone(),
                                score: validation.score,
                            },
                        );
                        return Ok(DispatchOutcome {
                            content: generation.content,
                            provider: candidate.provider.clone(),
                            model: generation.model,
                            selection_reason: candidate.reason.clone(),
                            fallback_from: None,
                            validation_score: Some(validation.score),
                            trace,
                        });
                    }

                    // degraded content: serve the offline pack rather
                    // than spending another network attempt
                    tracing::warn!(
                        provider = %candidate.provider,
                        score = validation.score,
                        violations = ?validation.violations,
                        "generated content failed validation, serving offline pack"
                    );
                    trace.push(record(&candidate.provider, AttemptOutcome::ValidationFailed, started));
                    return Ok(fallback_outcome(
                        request.classification,
                        Some(candidate.provider.clone()),
                        trace,
                    ));
                }
                Err(ProviderError::Cancelled) => return Err(DispatchError::Cancelled),
                Err(error) => {
                    if error.marks_unhealthy() {
                        self.registry.mark_unhealthy(&candidate.provider);
                    }
                    tracing::warn!(provider = %candidate.provider, %error, "attempt failed, advancing cascade");
                    trace.push(record(&candidate.provider, outcome_for(&error), started));
                }
            }
        }

        // every live candidate failed; the offline pack still answers
        let fallback_from = last_attempted.map(|candidate| candidate.provider.clone());
        Ok(fallback_outcome(request.classification, fallback_from, trace))
    }
}

fn fallback_outcome(
    classification: &Classification,
    fallback_from: Option<String>,
    mut trace: Vec<AttemptRecord>,
) -> DispatchOutcome {
    let started = Instant::now();
    let content = study_pack(&classification.tags);
    trace.push(record(FALLBACK_PROVIDER, AttemptOutcome::Fallback, started));
    DispatchOutcome {
        content,
        provider: FALLBACK_PROVIDER.to_owned(),
        model: FALLBACK_MODEL.to_owned(),
        selection_reason: "offline study pack served while live providers are degraded".to_owned(),
        fallback_from,
        validation_score: None,
        trace,
    }
}

const fn outcome_for(error: &ProviderError) -> AttemptOutcome {
    match error {
        ProviderError::Unreachable(_) | ProviderError::Timeout => AttemptOutcome::Unreachable,
        ProviderError::AuthOrConfig(_) => AttemptOutcome::AuthOrConfig,
        ProviderError::Malformed(_) | ProviderError::Cancelled => AttemptOutcome::Malformed,
    }
}

fn record(provider: &str, outcome: AttemptOutcome, started: Instant) -> AttemptRecord {
    AttemptRecord {
        provider: provider.to_owned(),
        outcome,
        latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use lectern_routing::ProviderDescriptor;

    use super::*;

    fn candidate(name: &str) -> ScoredCandidate {
        ScoredCandidate {
            provider: name.to_owned(),
            score: 1.0,
            reason: "test".to_owned(),
        }
    }

    #[tokio::test]
    async fn unwired_candidates_are_traced_before_the_fallback() {
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderDescriptor {
            name: "ghost".to_owned(),
            display_name: "ghost".to_owned(),
            capabilities: BTreeSet::new(),
            cost_tier: 1,
            accessibility: AccessibilityClass::Regional,
            default_model: "ghost-model".to_owned(),
        });
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            Arc::new(ResponseCache::new(Duration::from_secs(60), 4, 70)),
            Validator::with_default_rules(70),
        );

        let classification = Classification {
            tags: BTreeSet::new(),
            complex: false,
        };
        // "phantom" was never registered, "ghost" has no backend wired
        let candidates = vec![candidate("phantom"), candidate("ghost")];
        let request = DispatchRequest {
            candidates: &candidates,
            classification: &classification,
            fingerprint: "fp",
            prompt: "question",
            model_override: None,
            temperature: None,
            max_tokens: None,
        };

        let outcome = dispatcher
            .dispatch(request, &RequestContext::detached())
            .await
            .unwrap();

        assert_eq!(outcome.provider, FALLBACK_PROVIDER);
        let outcomes: Vec<AttemptOutcome> = outcome.trace.iter().map(|a| a.outcome).collect();
        assert_eq!(
            outcomes,
            [
                AttemptOutcome::Misconfigured,
                AttemptOutcome::Misconfigured,
                AttemptOutcome::Fallback,
            ]
        );
    }
}
