#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Lectern routes tutoring questions across LLM providers
//!
//! A question is classified by subject, candidate providers are ranked
//! by capability and cost, and the dispatch cascade tries them in order
//! with caching, structural validation, and a templated offline
//! fallback so the caller always receives a usable answer.

pub mod dispatch;
pub mod pipeline;

pub use dispatch::{DispatchError, DispatchOutcome, DispatchRequest, Dispatcher};
pub use lectern_config::Config;
pub use lectern_core::{AnswerRequest, AnswerResult, AttemptOutcome, AttemptRecord, RequestContext};
pub use pipeline::Pipeline;
