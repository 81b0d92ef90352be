#![allow(clippy::must_use_candidate)]

//! Provider registry, content classification, and candidate scoring
//!
//! This crate decides *where* a question should go: the registry holds
//! the configured providers and their last-known health, the classifier
//! tags the question with subject domains, and the scorer turns both
//! into an ordered candidate list for the dispatch cascade.

pub mod classify;
pub mod error;
pub mod registry;
pub mod scoring;

pub use classify::{Classification, DomainTag, classify};
pub use error::RoutingError;
pub use registry::{HealthStatus, ProviderDescriptor, ProviderRegistry};
pub use scoring::{ScoredCandidate, rank};
