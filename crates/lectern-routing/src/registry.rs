use std::collections::BTreeSet;

use dashmap::DashMap;
use indexmap::IndexMap;
use lectern_config::{AccessibilityClass, ProviderConfig};

use crate::error::RoutingError;

/// Static facts about one configured provider
///
/// Everything the scorer needs to rank a provider without touching the
/// network. Health is tracked separately because it mutates at runtime.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    /// Registry key, unique per provider
    pub name: String,
    /// Human-readable name used in selection reasons
    pub display_name: String,
    /// Subject domains this provider is considered strong in
    pub capabilities: BTreeSet<String>,
    /// Relative cost on a 1 (cheapest) to 5 (most expensive) scale
    pub cost_tier: u8,
    /// Where the provider is reachable from
    pub accessibility: AccessibilityClass,
    /// Model used when the request does not override it
    pub default_model: String,
}

impl ProviderDescriptor {
    /// Build a descriptor from a configuration entry
    pub fn from_config(name: &str, config: &ProviderConfig) -> Self {
        Self {
            name: name.to_owned(),
            display_name: config.display_name.clone().unwrap_or_else(|| name.to_owned()),
            capabilities: config.capabilities.iter().cloned().collect(),
            cost_tier: config.cost_tier,
            accessibility: config.accessibility,
            default_model: config.default_model.clone(),
        }
    }
}

/// Last-known availability of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthStatus {
    /// Never attempted, treated as usable
    #[default]
    Unknown,
    /// Last attempt succeeded
    Healthy,
    /// Last attempt failed in a way that implicates the provider
    Unhealthy,
}

/// Registry of configured providers with per-provider health flags
///
/// Descriptors keep their registration order, which is the stable
/// tie-break for equal scores. Health flags live in a [`DashMap`] so
/// concurrent dispatches can update them without a registry-wide lock.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    descriptors: IndexMap<String, ProviderDescriptor>,
    health: DashMap<String, HealthStatus>,
}

impl ProviderRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the `[providers]` configuration table
    #[must_use]
    pub fn from_config(providers: &IndexMap<String, ProviderConfig>) -> Self {
        let mut registry = Self::new();
        for (name, config) in providers {
            registry.register(ProviderDescriptor::from_config(name, config));
        }
        registry
    }

    /// Add a provider, replacing any existing descriptor with the same name
    ///
    /// Re-registering keeps the provider's original position in the
    /// ordering and resets its health flag.
    pub fn register(&mut self, descriptor: ProviderDescriptor) {
        self.health.remove(&descriptor.name);
        self.descriptors.insert(descriptor.name.clone(), descriptor);
    }

    /// Descriptors in registration order
    pub fn list(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.descriptors.values()
    }

    /// Look up a provider by name
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::UnknownProvider`] if the name was never
    /// registered
    pub fn get(&self, name: &str) -> Result<&ProviderDescriptor, RoutingError> {
        self.descriptors
            .get(name)
            .ok_or_else(|| RoutingError::UnknownProvider { name: name.to_owned() })
    }

    /// Last-known health of a provider, `Unknown` if never attempted
    #[must_use]
    pub fn health(&self, name: &str) -> HealthStatus {
        self.health.get(name).map_or(HealthStatus::Unknown, |entry| *entry)
    }

    /// Record a successful attempt
    pub fn mark_healthy(&self, name: &str) {
        tracing::debug!(provider = %name, "marking provider healthy");
        self.health.insert(name.to_owned(), HealthStatus::Healthy);
    }

    /// Record a failure that implicates the provider itself
    pub fn mark_unhealthy(&self, name: &str) {
        tracing::warn!(provider = %name, "marking provider unhealthy");
        self.health.insert(name.to_owned(), HealthStatus::Unhealthy);
    }

    /// Number of registered providers
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the registry holds no providers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
