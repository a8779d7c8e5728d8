//! Error types for the Norwood analysis pipeline.
//!
//! Errors are organized by stage so messages carry the context needed to
//! act on them (file paths, model names, HTTP status codes).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Norwood operations.
#[derive(Error, Debug)]
pub enum NorwoodError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Analysis pipeline errors
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Analysis pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Embedding generation failed
    #[error("Embedding failed for {path}: {message}")]
    Embedding { path: PathBuf, message: String },

    /// Vector index query failed
    #[error("Index error: {message}")]
    Index {
        message: String,
        status_code: Option<u16>,
    },

    /// Score-to-probability conversion or fusion failed
    #[error("Scoring error for model {model}: {message}")]
    Scoring { model: String, message: String },

    /// LLM narrative generation failed
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        status_code: Option<u16>,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },
}

/// Convenience type alias for Norwood results.
pub type Result<T> = std::result::Result<T, NorwoodError>;

/// Convenience type alias for analysis-stage results.
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
