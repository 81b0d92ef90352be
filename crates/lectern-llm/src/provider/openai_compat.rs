//! OpenAI-style chat completions backend
//!
//! Also serves DeepSeek, Qwen, Zhipu, Kimi, and any other deployment
//! that speaks the same wire format, distinguished only by `base_url`.

use async_trait::async_trait;
use lectern_config::ProviderConfig;
use lectern_core::RequestContext;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{Generation, GenerationRequest, Provider, classify_status, classify_transport_error};
use crate::error::ProviderError;

/// Canonical OpenAI API base, used when no `base_url` is configured
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat completions backend
pub struct OpenAiCompatProvider {
    name: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl OpenAiCompatProvider {
    /// Create from provider configuration
    #[must_use]
    pub fn new(name: &str, config: &ProviderConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).expect("valid default URL"));

        Self {
            name: name.to_owned(),
            client: Client::new(),
            base_url,
            api_key: config.api_key.clone(),
        }
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        _context: &RequestContext,
    ) -> Result<Generation, ProviderError> {
        let wire_request = ChatRequest {
            model: &request.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut builder = self.client.post(self.completions_url()).json(&wire_request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::Malformed("response carried no content".to_owned()))?;

        Ok(Generation {
            content,
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
        })
    }
}
