#![allow(clippy::must_use_candidate, clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Generation backends, health probing, and the offline fallback
//!
//! One [`Provider`] implementation per wire protocol, a reachability
//! probe for locally hosted backends, and the templated study-pack
//! generator that serves when every live backend is degraded.

pub mod error;
pub mod fallback;
pub mod probe;
pub mod provider;

pub use error::ProviderError;
pub use probe::{HealthProbe, HttpHealthProbe};
pub use provider::{Generation, GenerationRequest, Provider, build_provider};
