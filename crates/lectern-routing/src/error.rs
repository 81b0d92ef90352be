use thiserror::Error;

/// Errors surfaced by registry lookups and candidate ranking
#[derive(Debug, Error)]
pub enum RoutingError {
    /// A lookup named a provider the registry has never seen
    #[error("unknown provider: {name}")]
    UnknownProvider {
        /// The name that failed to resolve
        name: String,
    },

    /// Ranking was asked to choose from an empty registry
    #[error("provider registry is empty")]
    RegistryEmpty,
}
