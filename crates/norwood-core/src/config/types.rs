//! Sub-configuration structs with defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub use crate::scoring::ensemble::EnsembleConfig;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where ONNX backbone models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.norwood/models"),
        }
    }
}

/// Input discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Supported input formats
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "heic".to_string(),
                "bmp".to_string(),
            ],
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Embedding timeout in milliseconds
    pub embed_timeout_ms: u64,

    /// Vector index query timeout in milliseconds
    pub query_timeout_ms: u64,

    /// LLM call timeout in milliseconds
    pub llm_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50,
            max_image_dimension: 8000,
            decode_timeout_ms: 5000,
            embed_timeout_ms: 30000,
            query_timeout_ms: 15000,
            llm_timeout_ms: 60000,
        }
    }
}

/// Retry settings for transient failures (index queries, LLM calls).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Max retry attempts
    pub attempts: u32,

    /// Base delay between retries in milliseconds
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 1000,
        }
    }
}

/// A single embedding backbone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackboneConfig {
    /// Model directory name under `model_dir` (contains `visual.onnx`)
    pub model: String,

    /// Square input size in pixels
    pub image_size: u32,

    /// Normalization preset: "imagenet", "clip", or "unit"
    pub normalization: String,
}

/// Embedding settings: the set of available backbones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backbones keyed by the short model name used everywhere else
    /// ("convnext", "vit", "swin", "clip")
    pub backbones: HashMap<String, BackboneConfig>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let mut backbones = HashMap::new();
        backbones.insert(
            "convnext".to_string(),
            BackboneConfig {
                model: "convnext-tiny".to_string(),
                image_size: 224,
                normalization: "imagenet".to_string(),
            },
        );
        backbones.insert(
            "vit".to_string(),
            BackboneConfig {
                model: "vit-base-patch16".to_string(),
                image_size: 224,
                normalization: "imagenet".to_string(),
            },
        );
        backbones.insert(
            "swin".to_string(),
            BackboneConfig {
                model: "swin-tiny-patch4".to_string(),
                image_size: 224,
                normalization: "imagenet".to_string(),
            },
        );
        backbones.insert(
            "clip".to_string(),
            BackboneConfig {
                model: "clip-vit-b32".to_string(),
                image_size: 224,
                normalization: "clip".to_string(),
            },
        );
        Self { backbones }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Index provider ("pinecone" or "memory")
    pub provider: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Number of nearest neighbors to retrieve per query
    pub top_k: usize,

    /// Optional namespace passed with every query
    pub namespace: Option<String>,

    /// Query endpoints keyed by model name. Dual-view models use
    /// `<model>_top` / `<model>_side` keys.
    pub endpoints: HashMap<String, String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            provider: "pinecone".to_string(),
            api_key: "${PINECONE_API_KEY}".to_string(),
            top_k: 10,
            namespace: None,
            endpoints: HashMap::new(),
        }
    }
}

/// Score-to-probability conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Number of stage classes
    pub num_classes: usize,

    /// Offset added to the argmax class index to produce the reported stage
    pub stage_offset: u32,

    /// Fallback softmax temperature
    pub default_temperature: f32,

    /// Softmax temperature per model; `default_temperature` applies otherwise
    pub temperatures: HashMap<String, f32>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let mut temperatures = HashMap::new();
        temperatures.insert("convnext".to_string(), 0.07);
        temperatures.insert("vit".to_string(), 0.07);
        temperatures.insert("swin".to_string(), 0.05);
        Self {
            num_classes: 7,
            stage_offset: 1,
            default_temperature: 0.07,
            temperatures,
        }
    }
}

impl ScoringConfig {
    /// Softmax temperature for a model, falling back to the default.
    pub fn temperature_for(&self, model: &str) -> f32 {
        self.temperatures
            .get(model)
            .copied()
            .unwrap_or(self.default_temperature)
    }
}

/// Late fusion settings across viewpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Weight of the top-view distribution (side view gets the remainder)
    pub top_weight: f32,

    /// Blend strength of the patient-profile prior, 0 disables it
    pub prior_strength: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            top_weight: 0.5,
            prior_strength: 0.0,
        }
    }
}

/// Which models drive each analysis path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Primary model of the single-view ensemble
    pub primary: String,

    /// Secondary model of the single-view ensemble
    pub secondary: String,

    /// Model used for dual-view (top + side) analysis
    pub view_model: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            primary: "convnext".to_string(),
            secondary: "vit".to_string(),
            view_model: "swin".to_string(),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,

    /// Include per-model distributions in output records
    pub include_distributions: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
            include_distributions: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// LLM provider configurations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI configuration
    pub openai: Option<OpenAiConfig>,

    /// Gemini configuration
    pub gemini: Option<GeminiConfig>,
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Gemini configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: "${GEMINI_API_KEY}".to_string(),
            model: "gemini-2.0-flash".to_string(),
        }
    }
}
