#![allow(clippy::must_use_candidate)]

//! Structural quality validation for generated answers
//!
//! Each rule that holds contributes its fixed point value; the score is
//! the earned share of the points from rules applicable to the content,
//! normalized to 0-100, and the result passes when it clears the
//! configured threshold. Validation never errors on malformed input: a
//! missing or unparseable structure is a violation, not a panic.

use url::Url;

/// Default pass threshold on the 0-100 score scale
pub const DEFAULT_PASS_THRESHOLD: u8 = 70;

/// One structural rule with the points it awards when satisfied
#[derive(Debug, Clone)]
pub enum Rule {
    /// Overall answer text meets a length floor
    MinContentLength {
        /// Minimum character count
        min_chars: usize,
        /// Points awarded when satisfied
        points: u8,
    },
    /// A named field is present and non-empty in the embedded JSON
    RequiredField {
        /// Top-level field name
        field: String,
        /// Points awarded when satisfied
        points: u8,
    },
    /// An array field holds a bounded number of items
    ItemCount {
        /// Top-level array field name
        field: String,
        /// Inclusive minimum item count
        min: usize,
        /// Inclusive maximum item count
        max: usize,
        /// Points awarded when satisfied
        points: u8,
    },
    /// Every string item in an array field meets a length floor
    MinItemLength {
        /// Top-level array field name
        field: String,
        /// Minimum character count per item
        min_chars: usize,
        /// Points awarded when satisfied
        points: u8,
    },
    /// Every `http(s)` URL embedded in the text parses
    WellFormedLinks {
        /// Points awarded when satisfied
        points: u8,
    },
}

impl Rule {
    fn points(&self) -> u8 {
        match self {
            Self::MinContentLength { points, .. }
            | Self::RequiredField { points, .. }
            | Self::ItemCount { points, .. }
            | Self::MinItemLength { points, .. }
            | Self::WellFormedLinks { points } => *points,
        }
    }

    fn name(&self) -> String {
        match self {
            Self::MinContentLength { .. } => "min_content_length".to_owned(),
            Self::RequiredField { field, .. } => format!("required_field({field})"),
            Self::ItemCount { field, .. } => format!("item_count({field})"),
            Self::MinItemLength { field, .. } => format!("min_item_length({field})"),
            Self::WellFormedLinks { .. } => "well_formed_links".to_owned(),
        }
    }

    /// Whether the rule applies to this content at all
    ///
    /// Rules that target the embedded JSON apply only when the content
    /// actually embeds a JSON object; they gate the structure that is
    /// present, not the choice to answer in prose. Inapplicable rules
    /// are excluded from scoring entirely, so prose is judged purely on
    /// length and link syntax.
    fn is_applicable(&self, json: Option<&serde_json::Value>) -> bool {
        match self {
            Self::MinContentLength { .. } | Self::WellFormedLinks { .. } => true,
            Self::RequiredField { .. } | Self::ItemCount { .. } | Self::MinItemLength { .. } => {
                json.is_some()
            }
        }
    }

    /// Whether the rule holds for this content
    fn is_satisfied(&self, content: &str, json: Option<&serde_json::Value>) -> bool {
        match self {
            Self::MinContentLength { min_chars, .. } => content.chars().count() >= *min_chars,
            Self::RequiredField { field, .. } => json.is_some_and(|value| field_non_empty(value, field)),
            Self::ItemCount { field, min, max, .. } => json.is_some_and(|value| {
                value.get(field).and_then(serde_json::Value::as_array).is_some_and(|items| {
                    (*min..=*max).contains(&items.len())
                })
            }),
            Self::MinItemLength { field, min_chars, .. } => json.is_some_and(|value| {
                value.get(field).and_then(serde_json::Value::as_array).is_some_and(|items| {
                    items.iter().all(|item| item_text(item).chars().count() >= *min_chars)
                })
            }),
            Self::WellFormedLinks { .. } => embedded_links(content).all(|link| Url::parse(link).is_ok()),
        }
    }
}

/// Outcome of validating one answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Points earned as a share of the applicable rules' points, 0-100
    pub score: u8,
    /// Names of the rules that did not hold
    pub violations: Vec<String>,
    /// Whether the score cleared the pass threshold
    pub passed: bool,
}

/// Rule engine applying a fixed rule list to generated answers
#[derive(Debug, Clone)]
pub struct Validator {
    rules: Vec<Rule>,
    pass_threshold: u8,
}

impl Validator {
    /// Validator with an explicit rule list
    #[must_use]
    pub fn new(rules: Vec<Rule>, pass_threshold: u8) -> Self {
        Self { rules, pass_threshold }
    }

    /// Validator with the default study-content rules
    ///
    /// The defaults expect either free prose of reasonable length or a
    /// structured study pack with populated `knowledge_points` and
    /// `experiments` lists and well-formed links.
    #[must_use]
    pub fn with_default_rules(pass_threshold: u8) -> Self {
        Self::new(
            vec![
                Rule::MinContentLength { min_chars: 50, points: 30 },
                Rule::RequiredField {
                    field: "knowledge_points".to_owned(),
                    points: 15,
                },
                Rule::ItemCount {
                    field: "knowledge_points".to_owned(),
                    min: 1,
                    max: 10,
                    points: 15,
                },
                Rule::MinItemLength {
                    field: "knowledge_points".to_owned(),
                    min_chars: 10,
                    points: 15,
                },
                Rule::RequiredField {
                    field: "experiments".to_owned(),
                    points: 10,
                },
                Rule::WellFormedLinks { points: 15 },
            ],
            pass_threshold,
        )
    }

    /// Score content against the rules that apply to it
    pub fn validate(&self, content: &str) -> ValidationResult {
        let json = extract_json(content);

        let mut earned: u32 = 0;
        let mut possible: u32 = 0;
        let mut violations = Vec::new();
        for rule in &self.rules {
            if !rule.is_applicable(json.as_ref()) {
                continue;
            }
            possible += u32::from(rule.points());
            if rule.is_satisfied(content, json.as_ref()) {
                earned += u32::from(rule.points());
            } else {
                violations.push(rule.name());
            }
        }

        // an empty (or entirely inapplicable) rule list passes trivially
        let score = if possible == 0 {
            100
        } else {
            u8::try_from(earned * 100 / possible).unwrap_or(100)
        };
        let passed = score >= self.pass_threshold;
        if !passed {
            tracing::debug!(score, ?violations, "content failed structural validation");
        }

        ValidationResult { score, violations, passed }
    }
}

/// Extract the JSON object embedded in answer text, if any
///
/// Takes the span from the first `{` to the last `}` so prose wrapped
/// around a JSON payload still parses. Returns `None` for anything that
/// does not parse as a JSON object.
fn extract_json(content: &str) -> Option<serde_json::Value> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(&content[start..=end]).ok()?;
    value.is_object().then_some(value)
}

fn field_non_empty(value: &serde_json::Value, field: &str) -> bool {
    match value.get(field) {
        Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
        Some(serde_json::Value::Array(items)) => !items.is_empty(),
        Some(serde_json::Value::Object(map)) => !map.is_empty(),
        Some(serde_json::Value::Null) | None => false,
        Some(_) => true,
    }
}

/// Text content of one list item: either the string itself or the
/// concatenation of its string fields for object items
fn item_text(item: &serde_json::Value) -> String {
    match item {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => map
            .values()
            .filter_map(serde_json::Value::as_str)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

fn embedded_links(content: &str) -> impl Iterator<Item = &str> {
    content
        .split_whitespace()
        .map(|token| token.trim_start_matches(['"', '\'', '(', '[', '<']))
        .filter(|token| token.starts_with("http://") || token.starts_with("https://"))
        .map(|token| token.trim_end_matches(['"', '\'', ',', ')', ']', '>', '.', ';']))
}
