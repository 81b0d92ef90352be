#![allow(clippy::must_use_candidate)]

//! Configuration for the Lectern dispatch core
//!
//! TOML-based configuration with `{{ env.VAR }}` expansion, loaded via
//! [`Config::load`] and validated before use.

pub mod cache;
pub mod context;
mod env;
mod loader;
pub mod provider;
pub mod routing;
pub mod validation;

use indexmap::IndexMap;
use serde::Deserialize;

pub use cache::CacheConfig;
pub use context::ContextConfig;
pub use provider::{AccessibilityClass, ProviderConfig, ProviderProtocol};
pub use routing::RoutingConfig;
pub use validation::ValidationConfig;

/// Top-level Lectern configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Provider descriptors keyed by name; iteration order is
    /// registration order
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
    /// Provider selection configuration
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Structural validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Prompt personalization configuration
    #[serde(default)]
    pub context: ContextConfig,
}
