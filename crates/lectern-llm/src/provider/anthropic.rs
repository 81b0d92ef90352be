//! Anthropic Messages API backend

use async_trait::async_trait;
use lectern_config::ProviderConfig;
use lectern_core::RequestContext;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{Generation, GenerationRequest, Provider, classify_status, classify_transport_error};
use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// The Messages API requires an explicit token budget
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic Messages API backend
pub struct AnthropicProvider {
    name: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl AnthropicProvider {
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

    fn messages_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/v1/messages")
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [WireMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        _context: &RequestContext,
    ) -> Result<Generation, ProviderError> {
        let Some(api_key) = &self.api_key else {
            return Err(ProviderError::AuthOrConfig("no API key configured".to_owned()));
        };

        let wire_request = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: [WireMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let content: String = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if content.is_empty() {
            return Err(ProviderError::Malformed("response carried no text blocks".to_owned()));
        }

        Ok(Generation {
            content,
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
        })
    }
}
