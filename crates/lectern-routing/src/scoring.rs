use lectern_config::AccessibilityClass;

use crate::classify::Classification;
use crate::error::RoutingError;
use crate::registry::{HealthStatus, ProviderDescriptor, ProviderRegistry};

/// Weight of one cost tier step in the final score
const TIER_WEIGHT: f64 = 0.1;

/// Score ceiling above anything the overlap formula can produce,
/// used for explicit user overrides
const OVERRIDE_SCORE: f64 = 100.0;

/// One ranked dispatch candidate
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    /// Registry name of the provider
    pub provider: String,
    /// Composite routing score, higher is better
    pub score: f64,
    /// Human-readable account of why this provider ranked here
    pub reason: String,
}

/// Rank providers for a classified question
///
/// An explicit preference that names a known, non-unhealthy provider
/// short-circuits scoring entirely. Otherwise candidates are filtered
/// by reachability and health, scored by capability overlap with a
/// cost-tier adjustment, and sorted descending. Ties keep registration
/// order, so equal inputs always produce the same ordering.
///
/// The returned list is never empty: if the health filter would remove
/// every candidate it is dropped, and if reachability would, the full
/// registry is used.
///
/// # Errors
///
/// Returns [`RoutingError::RegistryEmpty`] if no providers are
/// registered
pub fn rank(
    registry: &ProviderRegistry,
    classification: &Classification,
    explicit: Option<&str>,
    allow_global: bool,
) -> Result<Vec<ScoredCandidate>, RoutingError> {
    if registry.is_empty() {
        return Err(RoutingError::RegistryEmpty);
    }

    if let Some(name) = explicit {
        if let Ok(descriptor) = registry.get(name) {
            if registry.health(name) != HealthStatus::Unhealthy {
                tracing::debug!(provider = %name, "explicit provider override");
                return Ok(vec![ScoredCandidate {
                    provider: descriptor.name.clone(),
                    score: OVERRIDE_SCORE,
                    reason: "user override".to_owned(),
                }]);
            }
            tracing::debug!(provider = %name, "override target is unhealthy, falling back to scoring");
        } else {
            tracing::debug!(provider = %name, "override target is unknown, falling back to scoring");
        }
    }

    let reachable: Vec<&ProviderDescriptor> = registry
        .list()
        .filter(|d| allow_global || d.accessibility != AccessibilityClass::Global)
        .collect();
    let pool: Vec<&ProviderDescriptor> = if reachable.is_empty() {
        registry.list().collect()
    } else {
        reachable
    };

    let healthy: Vec<&ProviderDescriptor> = pool
        .iter()
        .copied()
        .filter(|d| registry.health(&d.name) != HealthStatus::Unhealthy)
        .collect();
    let pool = if healthy.is_empty() { pool } else { healthy };

    let mut candidates: Vec<ScoredCandidate> = pool
        .into_iter()
        .map(|descriptor| score_one(descriptor, classification))
        .collect();

    // stable sort keeps registration order on equal scores
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    Ok(candidates)
}

fn score_one(descriptor: &ProviderDescriptor, classification: &Classification) -> ScoredCandidate {
    let overlap = classification
        .tags
        .iter()
        .filter(|tag| descriptor.capabilities.contains(tag.as_ref()))
        .count();

    // complex questions favor capable (expensive) tiers, simple ones cheap tiers
    let tier = f64::from(descriptor.cost_tier);
    let tier_adjustment = if classification.complex {
        tier * TIER_WEIGHT
    } else {
        (6.0 - tier) * TIER_WEIGHT
    };

    #[allow(clippy::cast_precision_loss)]
    let score = overlap as f64 + tier_adjustment;

    let reason = if classification.is_general() {
        format!(
            "general question routed to {} (cost tier {})",
            descriptor.display_name, descriptor.cost_tier
        )
    } else {
        let subjects: Vec<&str> = classification.tags.iter().map(|tag| tag.as_ref()).collect();
        format!(
            "{} question routed to {} (capability overlap {}, cost tier {})",
            subjects.join("+"),
            descriptor.display_name,
            overlap,
            descriptor.cost_tier
        )
    };

    ScoredCandidate {
        provider: descriptor.name.clone(),
        score,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::classify::classify;

    fn descriptor(
        name: &str,
        capabilities: &[&str],
        cost_tier: u8,
        accessibility: AccessibilityClass,
    ) -> ProviderDescriptor {
        ProviderDescriptor {
            name: name.to_owned(),
            display_name: name.to_owned(),
            capabilities: capabilities.iter().map(|&c| c.to_owned()).collect(),
            cost_tier,
            accessibility,
            default_model: "test-model".to_owned(),
        }
    }

    fn registry() -> ProviderRegistry {
        let mut r = ProviderRegistry::new();
        r.register(descriptor(
            "deepseek",
            &["math", "code", "chinese"],
            3,
            AccessibilityClass::Regional,
        ));
        r.register(descriptor(
            "qwen",
            &["chinese", "math"],
            2,
            AccessibilityClass::Regional,
        ));
        r.register(descriptor(
            "openai",
            &["math", "code", "electronics"],
            5,
            AccessibilityClass::Global,
        ));
        r.register(descriptor("ollama", &["code"], 1, AccessibilityClass::Local));
        r
    }

    fn general() -> Classification {
        Classification {
            tags: BTreeSet::new(),
            complex: false,
        }
    }

    #[test]
    fn empty_registry_is_an_error() {
        let empty = ProviderRegistry::new();
        assert!(matches!(
            rank(&empty, &general(), None, false),
            Err(RoutingError::RegistryEmpty)
        ));
    }

    #[test]
    fn override_short_circuits_scoring() {
        let registry = registry();
        let ranked = rank(&registry, &general(), Some("qwen"), false).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].provider, "qwen");
        assert_eq!(ranked[0].reason, "user override");
    }

    #[test]
    fn unhealthy_override_falls_back_to_scoring() {
        let registry = registry();
        registry.mark_unhealthy("qwen");
        let ranked = rank(&registry, &general(), Some("qwen"), false).unwrap();
        assert!(ranked.len() > 1);
        assert!(ranked.iter().all(|c| c.provider != "qwen"));
    }

    #[test]
    fn unknown_override_falls_back_to_scoring() {
        let registry = registry();
        let ranked = rank(&registry, &general(), Some("mystery"), false).unwrap();
        assert!(ranked.len() > 1);
    }

    #[test]
    fn global_providers_excluded_unless_allowed() {
        let registry = registry();
        let classification = classify("solve this integral", 200);

        let restricted = rank(&registry, &classification, None, false).unwrap();
        assert!(restricted.iter().all(|c| c.provider != "openai"));

        let open = rank(&registry, &classification, None, true).unwrap();
        assert!(open.iter().any(|c| c.provider == "openai"));
    }

    #[test]
    fn capability_overlap_outranks_cost_tier() {
        let registry = registry();
        let classification = classify("用python写代码求解这个方程", 200);
        let ranked = rank(&registry, &classification, None, false).unwrap();
        // deepseek matches math+code+chinese, qwen only math+chinese
        assert_eq!(ranked[0].provider, "deepseek");
    }

    #[test]
    fn simple_questions_prefer_cheap_tiers() {
        let registry = registry();
        let ranked = rank(&registry, &general(), None, false).unwrap();
        assert_eq!(ranked[0].provider, "ollama");
    }

    #[test]
    fn complex_questions_prefer_capable_tiers() {
        let registry = registry();
        let classification = Classification {
            tags: BTreeSet::new(),
            complex: true,
        };
        let ranked = rank(&registry, &classification, None, false).unwrap();
        assert_eq!(ranked[0].provider, "deepseek");
    }

    #[test]
    fn all_unhealthy_drops_the_health_filter() {
        let registry = registry();
        for name in ["deepseek", "qwen", "ollama"] {
            registry.mark_unhealthy(name);
        }
        let ranked = rank(&registry, &general(), None, false).unwrap();
        assert!(!ranked.is_empty());
    }

    #[test]
    fn equal_scores_keep_registration_order() {
        let mut registry = ProviderRegistry::new();
        registry.register(descriptor("first", &[], 2, AccessibilityClass::Regional));
        registry.register(descriptor("second", &[], 2, AccessibilityClass::Regional));
        let ranked = rank(&registry, &general(), None, false).unwrap();
        assert_eq!(ranked[0].provider, "first");
        assert_eq!(ranked[1].provider, "second");
    }

    #[test]
    fn reason_names_the_matched_subjects() {
        let registry = registry();
        let classification = classify("debug this python code", 200);
        let ranked = rank(&registry, &classification, None, false).unwrap();
        assert!(ranked[0].reason.contains("code question"));
    }
}
