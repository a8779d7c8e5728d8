//! LLM narrative generation for staged predictions.
//!
//! - **provider**: the `LlmProvider` trait, request/response types, factory
//! - **openai** / **gemini**: hosted provider implementations
//! - **retry**: retryable-error classification and backoff
//! - **narrator**: retry/timeout loop that produces one narrative

pub mod gemini;
pub mod narrator;
pub mod openai;
pub mod provider;
pub mod retry;

pub use narrator::{NarrateOptions, Narrator};
pub use provider::{ImageInput, LlmProvider, LlmProviderFactory, LlmRequest, LlmResponse};
