//! Gemini LLM provider using the generateContent API.
//!
//! Sends the scalp image (when present) as an inline base64 part ahead of
//! the text prompt. The API key travels as a query parameter.

use super::provider::{LlmProvider, LlmRequest, LlmResponse};
use crate::error::AnalysisError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider using the generateContent API.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
enum Part {
    #[serde(rename = "inline_data")]
    InlineData { mime_type: String, data: String },
    #[serde(rename = "text")]
    Text(String),
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

// --- Response types ---

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u32>,
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, AnalysisError> {
        let start = Instant::now();

        let mut parts = Vec::with_capacity(2);
        if let Some(image) = &request.image {
            parts.push(Part::InlineData {
                mime_type: image.media_type.clone(),
                data: image.data.clone(),
            });
        }
        parts.push(Part::Text(request.prompt.clone()));

        let body = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            BASE_URL, self.model, self.api_key
        );

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| AnalysisError::Llm {
                message: format!("Gemini request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AnalysisError::Llm {
                message: format!("Gemini HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let gen_resp: GenerateResponse = resp.json().await.map_err(|e| AnalysisError::Llm {
            message: format!("Failed to parse Gemini response: {e}"),
            status_code: None,
        })?;

        let text = gen_resp
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AnalysisError::Llm {
                message: "Gemini returned no candidates with text content".to_string(),
                status_code: None,
            });
        }

        Ok(LlmResponse {
            text,
            model: gen_resp.model_version.unwrap_or_else(|| self.model.clone()),
            tokens_used: gen_resp
                .usage_metadata
                .and_then(|u| u.total_token_count),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(60)
    }
}
