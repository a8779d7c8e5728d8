//! LLM provider trait and request/response types.
//!
//! Defines the interface that all LLM providers implement, plus the
//! factory that creates the right provider from CLI flags and config.

use crate::config::{resolve_env_var, LlmConfig};
use crate::error::AnalysisError;
use crate::types::{PatientProfile, StagePrediction};
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

/// Base64-encoded image ready to send to an LLM API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Create an `ImageInput` from raw bytes and format string.
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            other => {
                tracing::warn!("Unknown image format '{other}', defaulting to image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A request to explain a staged prediction.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// The analyzed scalp image, when the provider should see it
    pub image: Option<ImageInput>,
    /// Text prompt for the model
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl LlmRequest {
    /// Build an explanation request from a prediction and optional context.
    ///
    /// The profile, when present, is woven into the prompt so the model
    /// can phrase recommendations appropriately.
    pub fn explain_stage(
        prediction: &StagePrediction,
        num_classes: usize,
        profile: &PatientProfile,
        image: Option<ImageInput>,
    ) -> Self {
        let mut prompt = format!(
            "A scalp image analysis classified this patient's hair loss at \
             stage {} on a {}-stage scale.",
            prediction.stage, num_classes
        );

        if let Some(age) = profile.age {
            prompt.push_str(&format!(" The patient is {age} years old."));
        }
        match profile.family_history {
            Some(true) => prompt.push_str(" There is a family history of hair loss."),
            Some(false) => prompt.push_str(" There is no known family history of hair loss."),
            None => {}
        }

        prompt.push_str(
            " Explain in 2-4 plain-language sentences what this stage typically \
             looks like and what sensible next steps are. Do not diagnose, \
             do not mention probabilities, and keep a calm, factual tone.",
        );

        Self {
            image,
            prompt,
            max_tokens: 300,
            temperature: 0.3,
        }
    }
}

/// The response from an LLM explanation call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all LLM providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn LlmProvider>` for dynamic dispatch).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging (e.g., "openai", "gemini").
    fn name(&self) -> &str;

    /// Check whether the provider is configured.
    async fn is_available(&self) -> bool;

    /// Generate an explanation for the given request.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, AnalysisError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Factory that creates the appropriate provider from CLI flags and config.
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create an LLM provider based on provider name, config, and optional model override.
    pub fn create(
        provider: &str,
        config: &LlmConfig,
        model_override: Option<&str>,
    ) -> Result<Box<dyn LlmProvider>, AnalysisError> {
        match provider {
            "openai" => {
                let cfg = config.openai.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| AnalysisError::Llm {
                    message: "OpenAI API key not set. Set OPENAI_API_KEY env var.".to_string(),
                    status_code: None,
                })?;
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::openai::OpenAiProvider::new(
                    &api_key, &model,
                )))
            }
            "gemini" => {
                let cfg = config.gemini.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| AnalysisError::Llm {
                    message: "Gemini API key not set. Set GEMINI_API_KEY env var.".to_string(),
                    status_code: None,
                })?;
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::gemini::GeminiProvider::new(
                    &api_key, &model,
                )))
            }
            other => Err(AnalysisError::Llm {
                message: format!("Unknown LLM provider: {other}"),
                status_code: None,
            }),
        }
    }
}
