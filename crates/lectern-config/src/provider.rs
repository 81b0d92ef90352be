use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Static descriptor for a single generation backend
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Wire protocol spoken by the backend
    #[serde(rename = "type")]
    pub protocol: ProviderProtocol,
    /// API key for authentication; local backends may omit it
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override (required for `openai_compat` deployments that
    /// are not the canonical API, e.g. DeepSeek or Qwen endpoints)
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Model requested when the caller does not override it
    pub default_model: String,
    /// Display name used in human-readable selection reasons
    #[serde(default)]
    pub display_name: Option<String>,
    /// Domain tags the backend is known to be good at
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Relative expense class, 1 (cheap) to 5 (premium)
    pub cost_tier: u8,
    /// Where the backend is reachable from
    #[serde(default)]
    pub accessibility: AccessibilityClass,
    /// Per-attempt timeout as a duration string (e.g. "30s");
    /// defaults by accessibility class when absent
    #[serde(default)]
    pub timeout: Option<String>,
}

/// Supported backend wire protocols
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderProtocol {
    /// OpenAI-style chat completions (also covers DeepSeek, Qwen,
    /// Zhipu, Kimi and other compatible deployments)
    OpenaiCompat,
    /// Anthropic Messages API
    Anthropic,
    /// Google Generative Language API
    Google,
    /// Local Ollama daemon
    Ollama,
}

/// Network reachability class of a backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessibilityClass {
    /// Same-host daemon, optionally absent in a deployment
    Local,
    /// Reachable without crossing restricted network boundaries
    #[default]
    Regional,
    /// Requires unrestricted international network access
    Global,
}
