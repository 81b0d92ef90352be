//! Google Generative Language API backend

use async_trait::async_trait;
use lectern_config::ProviderConfig;
use lectern_core::RequestContext;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{Generation, GenerationRequest, Provider, classify_status, classify_transport_error};
use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google `generateContent` backend
pub struct GoogleProvider {
    name: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl GoogleProvider {
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

    fn generate_url(&self, model: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/v1beta/models/{model}:generateContent")
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl Provider for GoogleProvider {
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

        let generation_config = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| {
            GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            }
        });
        let wire_request = GenerateRequest {
            contents: [Content {
                parts: [Part {
                    text: &request.prompt,
                }],
            }],
            generation_config,
        };

        let response = self
            .client
            .post(self.generate_url(&request.model))
            .query(&[("key", api_key.expose_secret())])
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

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let content: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if content.is_empty() {
            return Err(ProviderError::Malformed("response carried no candidates".to_owned()));
        }

        Ok(Generation {
            content,
            model: request.model.clone(),
        })
    }
}
