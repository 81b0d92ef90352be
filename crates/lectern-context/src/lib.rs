#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Personalization context merged into outgoing prompts
//!
//! The builder takes whatever the surrounding application knows about a
//! user (style preferences, retrieved knowledge snippets) and folds it
//! into the prompt deterministically, so the same inputs always produce
//! the same augmented prompt and the same cache fingerprint.

use async_trait::async_trait;
use lectern_config::ContextConfig;
use serde::Deserialize;
use thiserror::Error;

/// Answer style the user prefers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, strum::EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum StylePreference {
    /// Thorough step-by-step explanations
    #[default]
    Detailed,
    /// Short answers, essentials only
    Concise,
    /// Formal register with precise terminology
    Academic,
    /// Conversational register
    Casual,
}

impl StylePreference {
    /// Parse a stored preference string, defaulting to `Detailed` for
    /// anything unrecognized
    #[must_use]
    pub fn parse_lossy(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    fn directive(self) -> &'static str {
        match self {
            Self::Detailed => {
                "Explain thoroughly, step by step, showing intermediate reasoning and worked examples."
            }
            Self::Concise => "Answer briefly. Give only the essential result and a one-line justification.",
            Self::Academic => "Use a formal academic register with precise terminology and cited principles.",
            Self::Casual => "Keep the tone conversational and approachable, like explaining to a friend.",
        }
    }
}

/// How long the user wants answers to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, strum::EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum LengthPreference {
    /// A few sentences
    Short,
    /// A few paragraphs
    #[default]
    Medium,
    /// As long as the topic needs
    Long,
}

impl LengthPreference {
    fn directive(self) -> &'static str {
        match self {
            Self::Short => "Keep the answer to a few sentences.",
            Self::Medium => "Keep the answer to a few focused paragraphs.",
            Self::Long => "Cover the topic in depth, at whatever length it needs.",
        }
    }
}

/// Stored preferences for one user
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UserPreferences {
    /// Preferred answer style
    #[serde(default)]
    pub style: StylePreference,
    /// Preferred answer length
    #[serde(default)]
    pub response_length: LengthPreference,
    /// Ask for claims to be tied back to their sources
    #[serde(default)]
    pub include_sources: bool,
    /// Ask for the reasoning behind each step, not just results
    #[serde(default)]
    pub explain_reasoning: bool,
}

/// One retrieved knowledge-base snippet
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeSnippet {
    /// Identifier of the source document
    pub source_id: String,
    /// Extracted text
    pub text: String,
    /// Retrieval relevance, higher is more relevant
    pub relevance: f64,
}

/// Everything known about the requesting user at dispatch time
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    /// Stored preferences, defaults for anonymous users
    pub preferences: UserPreferences,
    /// Retrieved snippets in retrieval order
    pub snippets: Vec<KnowledgeSnippet>,
}

/// Failure talking to a personalization collaborator
#[derive(Debug, Error)]
pub enum ContextError {
    /// The backing store or search index could not be reached
    #[error("personalization collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Knowledge-base text search supplied by the surrounding application
#[async_trait]
pub trait KnowledgeRetrieval: Send + Sync {
    /// Top-ranked snippets for a query, most relevant first
    async fn search(&self, query: &str, user_id: &str) -> Result<Vec<KnowledgeSnippet>, ContextError>;
}

/// User preference storage supplied by the surrounding application
#[async_trait]
pub trait UserProfileStore: Send + Sync {
    /// Stored preferences for a user
    async fn preferences(&self, user_id: &str) -> Result<UserPreferences, ContextError>;
}

/// Subject scope stated ahead of every augmented prompt
const SCOPE_PREAMBLE: &str = "You are a STEM tutoring assistant covering mathematics, physics, \
                              chemistry, biology, electronics, and programming. Ground every answer \
                              in established principles and prefer worked examples over abstractions.";

/// Appended when the user wants claims tied to their sources
const SOURCES_DIRECTIVE: &str = "Name the sources or established principles each claim rests on.";

/// Appended when the user wants the reasoning spelled out
const REASONING_DIRECTIVE: &str = "Explain the reasoning behind each step, not just the final result.";

/// Deterministic prompt augmentation
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    /// Builder with the given limits
    #[must_use]
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Merge user context into a prompt
    ///
    /// Concatenates, in fixed order: the scope preamble, the style,
    /// length, and profile-flag directives, up to `max_snippets`
    /// snippets ranked by relevance (ties keep retrieval order), then
    /// the raw prompt. When the result would exceed `max_chars` the
    /// snippets are truncated rather than dropped, each keeping at
    /// least its first `snippet_keep_chars` characters.
    #[must_use]
    pub fn augment(&self, raw_prompt: &str, user_context: &UserContext) -> String {
        let preferences = &user_context.preferences;
        let mut directives = String::from(preferences.style.directive());
        directives.push(' ');
        directives.push_str(preferences.response_length.directive());
        if preferences.include_sources {
            directives.push(' ');
            directives.push_str(SOURCES_DIRECTIVE);
        }
        if preferences.explain_reasoning {
            directives.push(' ');
            directives.push_str(REASONING_DIRECTIVE);
        }

        let mut ranked: Vec<&KnowledgeSnippet> = user_context.snippets.iter().collect();
        // stable sort keeps retrieval order for equal relevance
        ranked.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        ranked.truncate(self.config.max_snippets);

        let fixed_chars = SCOPE_PREAMBLE.chars().count()
            + directives.chars().count()
            + raw_prompt.chars().count()
            + 64; // headroom for separators and snippet labels

        let snippet_budget = self.config.max_chars.saturating_sub(fixed_chars);
        let snippets = self.fit_snippets(&ranked, snippet_budget);

        let mut out = String::with_capacity(self.config.max_chars.min(8192));
        out.push_str(SCOPE_PREAMBLE);
        out.push_str("\n\n");
        out.push_str(&directives);
        if !snippets.is_empty() {
            out.push_str("\n\nRelevant material from the user's library:");
            for (snippet, text) in &snippets {
                out.push_str("\n- [");
                out.push_str(&snippet.source_id);
                out.push_str("] ");
                out.push_str(text);
            }
        }
        out.push_str("\n\n");
        out.push_str(raw_prompt);

        tracing::debug!(
            snippets = snippets.len(),
            chars = out.chars().count(),
            "augmented prompt built"
        );
        out
    }

    /// Truncate ranked snippets to fit a shared character budget
    fn fit_snippets<'a>(
        &self,
        ranked: &[&'a KnowledgeSnippet],
        budget: usize,
    ) -> Vec<(&'a KnowledgeSnippet, String)> {
        if ranked.is_empty() {
            return Vec::new();
        }

        let total: usize = ranked.iter().map(|s| s.text.chars().count()).sum();
        if total <= budget {
            return ranked.iter().map(|&s| (s, s.text.clone())).collect();
        }

        // over budget: give each snippet an even share, but never cut
        // below the configured keep floor
        let share = (budget / ranked.len()).max(self.config.snippet_keep_chars);
        ranked
            .iter()
            .map(|&snippet| {
                let text = if snippet.text.chars().count() <= share {
                    snippet.text.clone()
                } else {
                    snippet.text.chars().take(share).collect()
                };
                (snippet, text)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ContextConfig {
        ContextConfig::default()
    }

    fn snippet(source_id: &str, text: &str, relevance: f64) -> KnowledgeSnippet {
        KnowledgeSnippet {
            source_id: source_id.to_owned(),
            text: text.to_owned(),
            relevance,
        }
    }

    #[test]
    fn unknown_style_string_defaults_to_detailed() {
        assert_eq!(StylePreference::parse_lossy("verbose"), StylePreference::Detailed);
        assert_eq!(StylePreference::parse_lossy(""), StylePreference::Detailed);
        assert_eq!(StylePreference::parse_lossy("Concise"), StylePreference::Concise);
    }

    #[test]
    fn augmentation_is_deterministic() {
        let builder = ContextBuilder::new(config());
        let context = UserContext {
            preferences: UserPreferences::default(),
            snippets: vec![snippet("doc-1", "Kirchhoff's current law", 0.9)],
        };
        let first = builder.augment("explain node analysis", &context);
        assert_eq!(builder.augment("explain node analysis", &context), first);
    }

    #[test]
    fn fixed_section_order() {
        let builder = ContextBuilder::new(config());
        let context = UserContext {
            preferences: UserPreferences {
                style: StylePreference::Concise,
                response_length: LengthPreference::Short,
                ..UserPreferences::default()
            },
            snippets: vec![snippet("doc-1", "a snippet about circuits", 0.5)],
        };
        let out = builder.augment("the question", &context);

        let preamble_at = out.find("STEM tutoring assistant").unwrap();
        let directive_at = out.find("Answer briefly").unwrap();
        let snippet_at = out.find("a snippet about circuits").unwrap();
        let prompt_at = out.find("the question").unwrap();
        assert!(preamble_at < directive_at);
        assert!(directive_at < snippet_at);
        assert!(snippet_at < prompt_at);
    }

    fn context_with(preferences: UserPreferences) -> UserContext {
        UserContext {
            preferences,
            snippets: Vec::new(),
        }
    }

    #[test]
    fn length_preference_shapes_the_directive() {
        let builder = ContextBuilder::new(config());
        let short = context_with(UserPreferences {
            response_length: LengthPreference::Short,
            ..UserPreferences::default()
        });
        let long = context_with(UserPreferences {
            response_length: LengthPreference::Long,
            ..UserPreferences::default()
        });

        assert!(builder.augment("what is entropy", &short).contains("a few sentences"));
        assert!(builder.augment("what is entropy", &long).contains("in depth"));
    }

    #[test]
    fn profile_flags_append_their_directives() {
        let builder = ContextBuilder::new(config());

        let plain = builder.augment("what is entropy", &UserContext::default());
        assert!(!plain.contains("each claim rests on"));
        assert!(!plain.contains("reasoning behind each step"));

        let flagged_context = context_with(UserPreferences {
            include_sources: true,
            explain_reasoning: true,
            ..UserPreferences::default()
        });
        let flagged = builder.augment("what is entropy", &flagged_context);
        assert!(flagged.contains("Name the sources"));
        assert!(flagged.contains("Explain the reasoning behind each step"));
        // directives sit between the preamble and the question
        assert!(flagged.find("Name the sources").unwrap() < flagged.find("what is entropy").unwrap());
    }

    #[test]
    fn keeps_only_the_three_most_relevant_snippets() {
        let builder = ContextBuilder::new(config());
        let context = UserContext {
            preferences: UserPreferences::default(),
            snippets: vec![
                snippet("low", "least relevant snippet", 0.1),
                snippet("top", "most relevant snippet", 0.9),
                snippet("mid-a", "first of the tied pair", 0.5),
                snippet("mid-b", "second of the tied pair", 0.5),
            ],
        };
        let out = builder.augment("q", &context);

        assert!(out.contains("[top]"));
        assert!(out.contains("[mid-a]"));
        assert!(out.contains("[mid-b]"));
        assert!(!out.contains("[low]"));
        // tie keeps retrieval order
        assert!(out.find("[mid-a]").unwrap() < out.find("[mid-b]").unwrap());
    }

    #[test]
    fn oversized_snippets_are_truncated_not_dropped() {
        let tight = ContextConfig {
            max_chars: 700,
            max_snippets: 3,
            snippet_keep_chars: 80,
        };
        let builder = ContextBuilder::new(tight);
        let long_a = format!("alpha {}", "a".repeat(500));
        let long_b = format!("bravo {}", "b".repeat(500));
        let context = UserContext {
            preferences: UserPreferences::default(),
            snippets: vec![snippet("doc-a", &long_a, 0.9), snippet("doc-b", &long_b, 0.8)],
        };
        let out = builder.augment("q", &context);

        // both survive, each keeping at least its first 80 characters
        assert!(out.contains(&long_a[..80]));
        assert!(out.contains(&long_b[..80]));
        assert!(!out.contains(&long_a));
        assert!(!out.contains(&long_b));
    }

    #[test]
    fn anonymous_context_still_produces_a_usable_prompt() {
        let builder = ContextBuilder::new(config());
        let out = builder.augment("what is a resistor", &UserContext::default());
        assert!(out.contains("what is a resistor"));
        assert!(out.contains("Explain thoroughly"));
        assert!(!out.contains("library"));
    }
}
