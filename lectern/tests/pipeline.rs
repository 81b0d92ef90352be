//! End-to-end pipeline behavior with scripted backends

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lectern::{AnswerRequest, AttemptOutcome, Config, Pipeline, RequestContext};
use lectern_core::GenerationOptions;
use lectern_llm::ProviderError;
use lectern_llm::provider::{Generation, GenerationRequest, Provider};

/// Long enough to clear the validation length floor
const GOOD_ANSWER: &str = "Ohm's law states that the current through a conductor is \
                           directly proportional to the voltage across it and inversely \
                           proportional to its resistance.";

/// Structured junk that fails the default validation rules
const BAD_ANSWER: &str = r#"{"knowledge_points": []}"#;

#[derive(Clone, Copy)]
enum Script {
    Reply(&'static str),
    Unreachable,
    AuthReject,
}

struct ScriptedBackend {
    name: String,
    script: Script,
    calls: Arc<AtomicUsize>,
    call_log: Arc<Mutex<Vec<String>>>,
    last_prompt: Arc<Mutex<Option<String>>>,
}

impl ScriptedBackend {
    fn new(name: &str, script: Script, call_log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_owned(),
            script,
            calls: Arc::new(AtomicUsize::new(0)),
            call_log,
            last_prompt: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl Provider for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        _context: &RequestContext,
    ) -> Result<Generation, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_log.lock().unwrap().push(self.name.clone());
        *self.last_prompt.lock().unwrap() = Some(request.prompt.clone());
        match self.script {
            Script::Reply(text) => Ok(Generation {
                content: text.to_owned(),
                model: request.model.clone(),
            }),
            Script::Unreachable => Err(ProviderError::Unreachable("connection refused".to_owned())),
            Script::AuthReject => Err(ProviderError::AuthOrConfig("HTTP 401".to_owned())),
        }
    }
}

fn config(cache_ttl: &str) -> Config {
    toml::from_str(&format!(
        r#"
        [cache]
        ttl = "{cache_ttl}"

        [providers.p1]
        type = "openai_compat"
        default_model = "model-one"
        capabilities = ["math", "electronics"]
        cost_tier = 3

        [providers.p2]
        type = "openai_compat"
        default_model = "model-two"
        capabilities = ["math", "electronics"]
        cost_tier = 2

        [providers.p3]
        type = "openai_compat"
        default_model = "model-three"
        capabilities = []
        cost_tier = 1
        "#
    ))
    .expect("test config parses")
}

struct Harness {
    pipeline: Pipeline,
    backends: Vec<Arc<ScriptedBackend>>,
    call_log: Arc<Mutex<Vec<String>>>,
}

fn harness(cache_ttl: &str, scripts: [Script; 3]) -> Harness {
    let call_log = Arc::new(Mutex::new(Vec::new()));
    let backends: Vec<Arc<ScriptedBackend>> = ["p1", "p2", "p3"]
        .iter()
        .zip(scripts)
        .map(|(name, script)| Arc::new(ScriptedBackend::new(name, script, Arc::clone(&call_log))))
        .collect();

    let mut pipeline = Pipeline::from_config(&config(cache_ttl)).expect("pipeline builds");
    for backend in &backends {
        pipeline = pipeline.with_backend(backend.name(), Arc::clone(backend) as Arc<dyn Provider>);
    }

    Harness {
        pipeline,
        backends,
        call_log,
    }
}

fn request(prompt: &str) -> AnswerRequest {
    AnswerRequest {
        prompt: prompt.to_owned(),
        provider_override: None,
        model_override: None,
        options: GenerationOptions::default(),
        use_knowledge_base: false,
        raw_context: None,
    }
}

#[tokio::test]
async fn repeated_question_is_served_from_cache() {
    let harness = harness("1h", [Script::Reply(GOOD_ANSWER); 3]);
    let context = RequestContext::detached();

    let first = harness.pipeline.answer(&request("solve this integral"), &context).await.unwrap();
    let second = harness.pipeline.answer(&request("solve this integral"), &context).await.unwrap();

    let total: usize = harness.backends.iter().map(|b| b.calls.load(Ordering::SeqCst)).sum();
    assert_eq!(total, 1);
    assert_eq!(second.content, first.content);
    assert_eq!(second.trace[0].outcome, AttemptOutcome::CacheHit);
    assert_eq!(second.selection_reason, "served from cache");
}

#[tokio::test]
async fn zero_ttl_disables_reuse() {
    let harness = harness("0s", [Script::Reply(GOOD_ANSWER); 3]);
    let context = RequestContext::detached();

    harness.pipeline.answer(&request("solve this integral"), &context).await.unwrap();
    harness.pipeline.answer(&request("solve this integral"), &context).await.unwrap();

    let total: usize = harness.backends.iter().map(|b| b.calls.load(Ordering::SeqCst)).sum();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn unhealthy_provider_is_never_attempted() {
    // p1 is down; p2 fails live so the cascade reaches p3
    let harness = harness("1h", [Script::Reply(GOOD_ANSWER), Script::Unreachable, Script::Reply(GOOD_ANSWER)]);
    harness.pipeline.registry().mark_unhealthy("p1");
    let context = RequestContext::detached();

    let result = harness
        .pipeline
        .answer(&request("compute the derivative of this matrix expression"), &context)
        .await
        .unwrap();

    let log = harness.call_log.lock().unwrap().clone();
    assert_eq!(log, ["p2", "p3"]);
    assert_eq!(result.provider, "p3");
    assert_eq!(harness.backends[0].calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn capability_match_is_attempted_before_weaker_candidates() {
    let harness = harness("1h", [Script::Unreachable, Script::Unreachable, Script::Reply(GOOD_ANSWER)]);
    let context = RequestContext::detached();

    // math question: p1 and p2 both match, p2 is cheaper; p3 matches nothing
    let result = harness.pipeline.answer(&request("solve this integral"), &context).await.unwrap();

    let log = harness.call_log.lock().unwrap().clone();
    assert_eq!(log, ["p2", "p1", "p3"]);
    assert_eq!(result.provider, "p3");
}

#[tokio::test]
async fn all_unreachable_serves_the_offline_pack() {
    let harness = harness("1h", [Script::Unreachable; 3]);
    let context = RequestContext::detached();

    let result = harness
        .pipeline
        .answer(&request("请设计一个PID反馈控制系统"), &context)
        .await
        .unwrap();

    assert_eq!(result.provider, "offline-fallback");
    assert!(result.error.is_none());
    assert!(result.fallback_from.is_some());
    assert!(result.content.contains("circuitjs"));
    assert!(result.trace.iter().any(|a| a.outcome == AttemptOutcome::Fallback));
}

#[tokio::test]
async fn validation_failure_falls_back_without_burning_another_attempt() {
    let harness = harness("1h", [Script::Reply(GOOD_ANSWER), Script::Reply(BAD_ANSWER), Script::Reply(GOOD_ANSWER)]);
    harness.pipeline.registry().mark_unhealthy("p1");
    let context = RequestContext::detached();

    let result = harness.pipeline.answer(&request("solve this integral"), &context).await.unwrap();

    assert_eq!(result.provider, "offline-fallback");
    assert_eq!(result.fallback_from.as_deref(), Some("p2"));
    // the cascade stops at the fallback instead of trying p3
    assert_eq!(harness.backends[2].calls.load(Ordering::SeqCst), 0);
    assert!(result.trace.iter().any(|a| a.outcome == AttemptOutcome::ValidationFailed));
}

#[tokio::test]
async fn explicit_override_pins_the_provider() {
    let harness = harness("1h", [Script::Reply(GOOD_ANSWER); 3]);
    let context = RequestContext::detached();

    let mut req = request("solve this integral");
    req.provider_override = Some("p3".to_owned());
    let result = harness.pipeline.answer(&req, &context).await.unwrap();

    assert_eq!(result.provider, "p3");
    assert_eq!(result.selection_reason, "user override");
    assert_eq!(harness.backends[0].calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.backends[1].calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn auth_rejection_advances_without_marking_unhealthy() {
    let harness = harness("1h", [Script::Reply(GOOD_ANSWER), Script::AuthReject, Script::Reply(GOOD_ANSWER)]);
    harness.pipeline.registry().mark_unhealthy("p1");
    let context = RequestContext::detached();

    let result = harness.pipeline.answer(&request("solve this integral"), &context).await.unwrap();

    assert_eq!(result.provider, "p3");
    assert!(result.trace.iter().any(|a| a.outcome == AttemptOutcome::AuthOrConfig));
    // a credential problem is not a capacity signal
    use lectern_routing::HealthStatus;
    assert_ne!(harness.pipeline.registry().health("p2"), HealthStatus::Unhealthy);
}

#[tokio::test]
async fn empty_registry_is_the_only_surfaced_error() {
    let config: Config = toml::from_str("[providers]").expect("parses");
    let pipeline = Pipeline::from_config(&config).expect("builds");

    let result = pipeline
        .answer(&request("anything"), &RequestContext::detached())
        .await
        .unwrap();

    assert!(result.error.is_some());
    assert!(result.content.is_empty());
    assert!(result.trace.is_empty());
}

#[tokio::test]
async fn cancelled_request_returns_the_cancellation_error() {
    let harness = harness("1h", [Script::Reply(GOOD_ANSWER); 3]);
    let context = RequestContext::detached();
    context.cancellation.cancel();

    let outcome = harness.pipeline.answer(&request("solve this integral"), &context).await;
    assert!(outcome.is_err());
}

struct StaticKnowledge;

#[async_trait]
impl lectern_context::KnowledgeRetrieval for StaticKnowledge {
    async fn search(
        &self,
        _query: &str,
        _user_id: &str,
    ) -> Result<Vec<lectern_context::KnowledgeSnippet>, lectern_context::ContextError> {
        Ok(vec![lectern_context::KnowledgeSnippet {
            source_id: "doc-7".to_owned(),
            text: "Node voltage analysis notes from the user's own coursework".to_owned(),
            relevance: 0.8,
        }])
    }
}

struct StaticProfiles;

#[async_trait]
impl lectern_context::UserProfileStore for StaticProfiles {
    async fn preferences(
        &self,
        _user_id: &str,
    ) -> Result<lectern_context::UserPreferences, lectern_context::ContextError> {
        Ok(lectern_context::UserPreferences {
            style: lectern_context::StylePreference::Concise,
            response_length: lectern_context::LengthPreference::Short,
            include_sources: true,
            explain_reasoning: false,
        })
    }
}

#[tokio::test]
async fn collaborator_context_reaches_the_backend() {
    let harness = harness("1h", [Script::Reply(GOOD_ANSWER); 3]);
    let pipeline = harness
        .pipeline
        .with_knowledge_retrieval(Arc::new(StaticKnowledge))
        .with_profile_store(Arc::new(StaticProfiles));

    let mut req = request("explain nodal circuit analysis");
    req.use_knowledge_base = true;
    pipeline.answer(&req, &RequestContext::for_user("alice")).await.unwrap();

    let served = harness
        .backends
        .iter()
        .find(|b| b.last_prompt.lock().unwrap().is_some())
        .expect("some backend was called");
    let prompt = served.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("Node voltage analysis notes"));
    assert!(prompt.contains("Answer briefly"));
    assert!(prompt.contains("a few sentences"));
    assert!(prompt.contains("Name the sources"));
    assert!(!prompt.contains("Explain the reasoning behind each step"));
    assert!(prompt.contains("explain nodal circuit analysis"));
}

#[tokio::test]
async fn personalized_answers_do_not_cross_users() {
    let harness = harness("1h", [Script::Reply(GOOD_ANSWER); 3]);

    harness
        .pipeline
        .answer(&request("solve this integral"), &RequestContext::for_user("alice"))
        .await
        .unwrap();
    harness
        .pipeline
        .answer(&request("solve this integral"), &RequestContext::for_user("bob"))
        .await
        .unwrap();

    let total: usize = harness.backends.iter().map(|b| b.calls.load(Ordering::SeqCst)).sum();
    assert_eq!(total, 2);
}
