use serde::Deserialize;

/// Prompt personalization configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Hard cap on the augmented prompt length in characters
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Maximum number of knowledge snippets merged into the prompt
    #[serde(default = "default_max_snippets")]
    pub max_snippets: usize,
    /// Minimum number of leading characters preserved per retained
    /// snippet when the length cap forces truncation
    #[serde(default = "default_snippet_keep_chars")]
    pub snippet_keep_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            max_snippets: default_max_snippets(),
            snippet_keep_chars: default_snippet_keep_chars(),
        }
    }
}

const fn default_max_chars() -> usize {
    6000
}

const fn default_max_snippets() -> usize {
    3
}

const fn default_snippet_keep_chars() -> usize {
    80
}
