use serde::Deserialize;

/// Provider selection configuration
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Whether providers with `global` accessibility are reachable in
    /// this deployment
    #[serde(default)]
    pub allow_global: bool,
    /// Character length above which a request is considered complex
    #[serde(default = "default_complexity_threshold")]
    pub complexity_threshold: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            allow_global: false,
            complexity_threshold: default_complexity_threshold(),
        }
    }
}

const fn default_complexity_threshold() -> usize {
    200
}
