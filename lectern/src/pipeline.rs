//! End-to-end pipeline wiring configuration into the cascade

use std::sync::Arc;

use lectern_cache::{ResponseCache, fingerprint};
use lectern_config::{AccessibilityClass, Config, ProviderProtocol, RoutingConfig};
use lectern_context::{ContextBuilder, KnowledgeRetrieval, UserContext, UserProfileStore};
use lectern_core::{AnswerRequest, AnswerResult, RequestContext};
use lectern_llm::provider::{OllamaProvider, build_provider};
use lectern_llm::{HttpHealthProbe, Provider};
use lectern_routing::{ProviderRegistry, classify, rank};
use lectern_validate::Validator;

use crate::dispatch::{DispatchError, DispatchRequest, Dispatcher};

/// The provider-routing pipeline
///
/// Owns the registry, cache, validator, and backends built from one
/// [`Config`]. Personalization collaborators are optional; without them
/// every request runs with default preferences and no snippets.
pub struct Pipeline {
    registry: Arc<ProviderRegistry>,
    dispatcher: Dispatcher,
    context_builder: ContextBuilder,
    routing: RoutingConfig,
    knowledge: Option<Arc<dyn KnowledgeRetrieval>>,
    profiles: Option<Arc<dyn UserProfileStore>>,
}

impl Pipeline {
    /// Build a pipeline from validated configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configured duration string fails to parse
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let registry = Arc::new(ProviderRegistry::from_config(&config.providers));

        let ttl = duration_str::parse(&config.cache.ttl)
            .map_err(|e| anyhow::anyhow!("invalid cache ttl '{}': {e}", config.cache.ttl))?;
        let cache = Arc::new(ResponseCache::new(ttl, config.cache.max_entries, config.cache.min_score));
        let validator = Validator::with_default_rules(config.validation.pass_threshold);

        let mut dispatcher = Dispatcher::new(Arc::clone(&registry), cache, validator);
        for (name, provider_config) in &config.providers {
            dispatcher.insert_backend(name, build_provider(name, provider_config));

            if let Some(ref timeout) = provider_config.timeout {
                let timeout = duration_str::parse(timeout)
                    .map_err(|e| anyhow::anyhow!("provider '{name}' has invalid timeout '{timeout}': {e}"))?;
                dispatcher.set_timeout(name, timeout);
            }

            // only locally hosted daemons get a reachability probe
            if matches!(provider_config.protocol, ProviderProtocol::Ollama)
                && provider_config.accessibility == AccessibilityClass::Local
            {
                let probe_url = OllamaProvider::new(name, provider_config).probe_url();
                dispatcher.insert_probe(name, Arc::new(HttpHealthProbe::new(probe_url)));
            }
        }

        Ok(Self {
            registry,
            dispatcher,
            context_builder: ContextBuilder::new(config.context.clone()),
            routing: config.routing,
            knowledge: None,
            profiles: None,
        })
    }

    /// Attach the knowledge-base search collaborator
    #[must_use]
    pub fn with_knowledge_retrieval(mut self, knowledge: Arc<dyn KnowledgeRetrieval>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    /// Attach the user preference store collaborator
    #[must_use]
    pub fn with_profile_store(mut self, profiles: Arc<dyn UserProfileStore>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    /// Replace the backend implementation for a named provider
    ///
    /// The production backend is built from configuration; this seam
    /// exists for embedding applications that bring their own transport
    /// and for tests.
    #[must_use]
    pub fn with_backend(mut self, name: &str, backend: Arc<dyn Provider>) -> Self {
        self.dispatcher.insert_backend(name, backend);
        self
    }

    /// Shared registry handle, for health inspection
    #[must_use]
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Answer one question
    ///
    /// Always produces a usable result: live answers when a provider
    /// cooperates, the offline study pack otherwise. The `error` field
    /// is populated only when the registry holds no usable candidates.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Cancelled`] when the caller aborts the request;
    /// every other failure is absorbed into the result
    pub async fn answer(
        &self,
        request: &AnswerRequest,
        context: &RequestContext,
    ) -> Result<AnswerResult, DispatchError> {
        let user_context = self.build_user_context(request, context).await;

        let mut prompt = request.prompt.clone();
        if let Some(ref raw_context) = request.raw_context {
            prompt.push_str("\n\nAdditional context from the caller:\n");
            prompt.push_str(raw_context);
        }
        let augmented = self.context_builder.augment(&prompt, &user_context);

        // classify the question itself, not the augmented scaffolding
        let classification = classify(&request.prompt, self.routing.complexity_threshold);
        let key = fingerprint(&augmented, context.user_id.as_deref());

        let candidates = match rank(
            &self.registry,
            &classification,
            request.provider_override.as_deref(),
            self.routing.allow_global,
        ) {
            Ok(candidates) => candidates,
            Err(error) => {
                tracing::error!(%error, "ranking failed, registry is unusable");
                return Ok(exhausted_result());
            }
        };

        let outcome = self
            .dispatcher
            .dispatch(
                DispatchRequest {
                    candidates: &candidates,
                    classification: &classification,
                    fingerprint: &key,
                    prompt: &augmented,
                    model_override: request.model_override.as_deref(),
                    temperature: request.options.temperature,
                    max_tokens: request.options.max_tokens,
                },
                context,
            )
            .await;

        match outcome {
            Ok(outcome) => Ok(AnswerResult {
                content: outcome.content,
                provider: outcome.provider,
                model: outcome.model,
                timestamp: jiff::Timestamp::now().to_string(),
                selection_reason: outcome.selection_reason,
                fallback_from: outcome.fallback_from,
                trace: outcome.trace,
                error: None,
            }),
            Err(DispatchError::RegistryExhausted) => Ok(exhausted_result()),
            Err(DispatchError::Cancelled) => Err(DispatchError::Cancelled),
        }
    }

    async fn build_user_context(&self, request: &AnswerRequest, context: &RequestContext) -> UserContext {
        let Some(user_id) = context.user_id.as_deref() else {
            return UserContext::default();
        };

        let mut user_context = UserContext::default();

        if let Some(profiles) = &self.profiles {
            match profiles.preferences(user_id).await {
                Ok(preferences) => user_context.preferences = preferences,
                Err(error) => {
                    tracing::warn!(%error, "profile lookup failed, using default preferences");
                }
            }
        }

        if request.use_knowledge_base && let Some(knowledge) = &self.knowledge {
            match knowledge.search(&request.prompt, user_id).await {
                Ok(snippets) => user_context.snippets = snippets,
                Err(error) => {
                    tracing::warn!(%error, "knowledge search failed, continuing without snippets");
                }
            }
        }

        user_context
    }
}

/// Result for the one fatal path: nothing was configured to attempt
fn exhausted_result() -> AnswerResult {
    AnswerResult {
        content: String::new(),
        provider: String::new(),
        model: String::new(),
        timestamp: jiff::Timestamp::now().to_string(),
        selection_reason: String::new(),
        fallback_from: None,
        trace: Vec::new(),
        error: Some("no providers are configured to serve this request".to_owned()),
    }
}
