use serde::Deserialize;

/// Response cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Entry lifetime as a duration string (e.g. "24h"); "0s" disables
    /// reuse entirely (every lookup misses)
    #[serde(default = "default_ttl")]
    pub ttl: String,
    /// Maximum number of entries before insertion-order eviction
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Minimum validation score for an entry to be admitted
    #[serde(default = "default_min_score")]
    pub min_score: u8,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            max_entries: default_max_entries(),
            min_score: default_min_score(),
        }
    }
}

fn default_ttl() -> String {
    "24h".to_owned()
}

const fn default_max_entries() -> usize {
    1024
}

const fn default_min_score() -> u8 {
    70
}
