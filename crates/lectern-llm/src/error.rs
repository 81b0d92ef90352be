use thiserror::Error;

/// Errors from a single generation attempt
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backend could not be reached or answered with a server error
    #[error("provider unreachable: {0}")]
    Unreachable(String),

    /// The attempt exceeded its time budget
    #[error("provider timed out")]
    Timeout,

    /// The backend rejected our credentials or configuration
    #[error("authentication or configuration rejected: {0}")]
    AuthOrConfig(String),

    /// A response arrived but could not be interpreted
    #[error("malformed provider response: {0}")]
    Malformed(String),

    /// The inbound request was aborted mid-attempt
    #[error("request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Whether this failure implicates the provider's capacity
    ///
    /// Credential rejections may be a transient key problem rather than
    /// a capacity signal, and a malformed body means the provider is up
    /// but misbehaving, so neither flips the health flag.
    pub const fn marks_unhealthy(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout)
    }
}
