//! The generation backend interface and its per-protocol implementations

pub mod anthropic;
pub mod google;
pub mod ollama;
pub mod openai_compat;

use std::sync::Arc;

use async_trait::async_trait;
use lectern_config::{ProviderConfig, ProviderProtocol};
use lectern_core::RequestContext;

use crate::error::ProviderError;

pub use anthropic::AnthropicProvider;
pub use google::GoogleProvider;
pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;

/// One generation call as sent to a backend
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Fully augmented prompt text
    pub prompt: String,
    /// Model to request
    pub model: String,
    /// Sampling temperature, backend default when absent
    pub temperature: Option<f64>,
    /// Output token budget, backend default when absent
    pub max_tokens: Option<u32>,
}

/// One completed generation
#[derive(Debug, Clone)]
pub struct Generation {
    /// Generated answer text
    pub content: String,
    /// Model that actually served the request
    pub model: String,
}

/// A generation backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Registry name of this backend instance
    fn name(&self) -> &str;

    /// Perform one generation call
    async fn generate(
        &self,
        request: &GenerationRequest,
        context: &RequestContext,
    ) -> Result<Generation, ProviderError>;
}

/// Construct the backend implementation for a configured provider
pub fn build_provider(name: &str, config: &ProviderConfig) -> Arc<dyn Provider> {
    match config.protocol {
        ProviderProtocol::OpenaiCompat => Arc::new(OpenAiCompatProvider::new(name, config)),
        ProviderProtocol::Anthropic => Arc::new(AnthropicProvider::new(name, config)),
        ProviderProtocol::Google => Arc::new(GoogleProvider::new(name, config)),
        ProviderProtocol::Ollama => Arc::new(OllamaProvider::new(name, config)),
    }
}

/// Map a transport failure onto the attempt error taxonomy
pub(crate) fn classify_transport_error(error: &reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Unreachable(error.to_string())
    }
}

/// Map a non-success HTTP status onto the attempt error taxonomy
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        ProviderError::AuthOrConfig(format!("HTTP {status}"))
    } else if status.is_client_error() {
        ProviderError::Malformed(format!("HTTP {status}: {}", truncate(body, 200)))
    } else {
        ProviderError::Unreachable(format!("HTTP {status}"))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
