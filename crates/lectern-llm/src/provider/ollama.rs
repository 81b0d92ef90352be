//! Local Ollama daemon backend
//!
//! The daemon is optionally absent in a given deployment, so dispatch
//! pairs this backend with a reachability probe against `/api/tags`
//! before committing to a generation call.

use async_trait::async_trait;
use lectern_config::ProviderConfig;
use lectern_core::RequestContext;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{Generation, GenerationRequest, Provider, classify_status, classify_transport_error};
use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama `/api/generate` backend
pub struct OllamaProvider {
    name: String,
    client: Client,
    base_url: Url,
}

impl OllamaProvider {
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
        }
    }

    fn generate_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/api/generate")
    }

    /// Endpoint the reachability probe should ping
    #[must_use]
    pub fn probe_url(&self) -> Url {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/api/tags")).expect("base URL joined with fixed path")
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(rename = "num_predict", skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    model: Option<String>,
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        _context: &RequestContext,
    ) -> Result<Generation, ProviderError> {
        let options = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| OllamaOptions {
            temperature: request.temperature,
            num_predict: request.max_tokens,
        });
        let wire_request = OllamaRequest {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            options,
        };

        let response = self
            .client
            .post(self.generate_url())
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

        let parsed: OllamaResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        if parsed.response.is_empty() {
            return Err(ProviderError::Malformed("response carried no text".to_owned()));
        }

        Ok(Generation {
            content: parsed.response,
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
        })
    }
}
