#![allow(clippy::must_use_candidate)]

//! Shared request and result types for the Lectern dispatch core

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Runtime context for one pipeline execution
///
/// Carries the caller identity and the cancellation token that is
/// threaded through every outbound I/O call.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Identity of the requesting user, when known
    pub user_id: Option<String>,
    /// Cancelled when the inbound request is aborted by its caller
    pub cancellation: CancellationToken,
}

impl RequestContext {
    /// Context for a named user
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Anonymous context with a fresh cancellation token
    pub fn detached() -> Self {
        Self::default()
    }
}

/// Inbound request consumed from the surrounding application
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnswerRequest {
    /// The raw natural-language question
    pub prompt: String,
    /// Pin dispatch to a named provider, bypassing scoring
    #[serde(default)]
    pub provider_override: Option<String>,
    /// Request a specific model instead of the provider default
    #[serde(default)]
    pub model_override: Option<String>,
    /// Sampling options forwarded to the backend
    #[serde(default)]
    pub options: GenerationOptions,
    /// Whether to merge personal knowledge snippets into the prompt
    #[serde(default)]
    pub use_knowledge_base: bool,
    /// Free-form extra context supplied by the caller
    #[serde(default)]
    pub raw_context: Option<String>,
}

/// Sampling options forwarded to the backend
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Output token budget
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Outbound result returned to the surrounding application
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResult {
    /// Generated answer text; always usable unless `error` is set
    pub content: String,
    /// Provider that produced the content (or the fallback generator)
    pub provider: String,
    /// Model that produced the content
    pub model: String,
    /// ISO-8601 timestamp of completion
    pub timestamp: String,
    /// Human-readable account of why this provider was chosen
    pub selection_reason: String,
    /// Provider that was attempted before falling back, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_from: Option<String>,
    /// Per-attempt dispatch trace for observability
    pub trace: Vec<AttemptRecord>,
    /// Populated only when the registry itself was exhausted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One dispatch attempt and its outcome
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    /// Provider attempted (or cache / fallback pseudo-stages)
    pub provider: String,
    /// How the attempt ended
    pub outcome: AttemptOutcome,
    /// Wall-clock latency of the attempt in milliseconds
    pub latency_ms: u64,
}

/// Terminal state of a single dispatch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Served from the response cache without a provider call
    CacheHit,
    /// Provider returned well-formed content that passed validation
    Success,
    /// Reachability probe failed before any generation call
    ProbeFailed,
    /// Candidate had no registry entry or backend wired, skipped
    Misconfigured,
    /// Network failure or timeout
    Unreachable,
    /// Credential or configuration rejection
    AuthOrConfig,
    /// Response arrived but could not be interpreted
    Malformed,
    /// Content arrived but failed structural validation
    ValidationFailed,
    /// Served by the local templated generator
    Fallback,
}
