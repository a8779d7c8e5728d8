//! Configuration management for Norwood.
//!
//! Configuration is loaded from the platform config directory
//! (`~/.config/norwood/config.toml` on Linux) with sensible defaults.
//! All config structs implement `Default`.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Norwood.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Input discovery settings
    pub processing: ProcessingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Retry settings
    pub retry: RetryConfig,

    /// Embedding backbone settings
    pub embedding: EmbeddingConfig,

    /// Vector index settings
    pub index: IndexConfig,

    /// Score-to-probability settings
    pub scoring: ScoringConfig,

    /// Two-model ensemble settings
    pub ensemble: EnsembleConfig,

    /// Viewpoint fusion settings
    pub fusion: FusionConfig,

    /// Model selection per analysis path
    pub analysis: AnalysisConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// LLM provider settings
    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories, falling back to
    /// `~/.norwood/config.toml` if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("ai", "norwood", "norwood")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".norwood").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        let path_str = self.general.model_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Resolve `${ENV_VAR}` references in config strings (API keys).
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok()
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scoring.num_classes, 7);
        assert_eq!(config.scoring.stage_offset, 1);
        assert_eq!(config.index.top_k, 10);
        assert_eq!(config.limits.max_file_size_mb, 50);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[scoring]"));
        assert!(toml.contains("[ensemble]"));
        assert!(toml.contains("[index]"));
    }

    #[test]
    fn test_default_backbones_present() {
        let config = Config::default();
        for name in ["convnext", "vit", "swin", "clip"] {
            assert!(config.embedding.backbones.contains_key(name), "{name}");
        }
    }

    #[test]
    fn test_temperature_lookup_falls_back() {
        let config = ScoringConfig::default();
        assert_eq!(config.temperature_for("swin"), 0.05);
        assert_eq!(config.temperature_for("unknown-model"), 0.07);
    }

    #[test]
    fn test_analysis_model_selection_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.primary, "convnext");
        assert_eq!(config.secondary, "vit");
        assert_eq!(config.view_model, "swin");
    }

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_env_var(""), None);
        // Unset env var returns None
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scoring]\nnum_classes = 4\n").unwrap();

        // Ensemble per-class tables default to length 7; overriding
        // num_classes without them must fail validation.
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("num_classes"));
    }

    #[test]
    fn test_load_from_consistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[scoring]
num_classes = 3

[ensemble]
primary_weights = [0.6, 0.5, 0.4]
primary_tau = [0.0, 0.0, 0.0]
secondary_tau = [0.0, 0.0, 0.0]
primary_strong = [false, false, false]
secondary_strong = [false, false, false]
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.scoring.num_classes, 3);
        assert_eq!(config.ensemble.primary_weights.len(), 3);
    }
}
