//! Configuration validation with range and consistency checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges and the
    /// per-class tables agree with `scoring.num_classes`.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.embed_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.embed_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.query_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.query_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.llm_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.llm_timeout_ms must be > 0".into(),
            ));
        }
        if self.index.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "index.top_k must be > 0".into(),
            ));
        }
        if self.scoring.num_classes == 0 {
            return Err(ConfigError::ValidationError(
                "scoring.num_classes must be > 0".into(),
            ));
        }
        if self.scoring.default_temperature <= 0.0 {
            return Err(ConfigError::ValidationError(
                "scoring.default_temperature must be > 0".into(),
            ));
        }
        for (model, t) in &self.scoring.temperatures {
            if *t <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "scoring.temperatures.{model} must be > 0"
                )));
            }
        }

        let n = self.scoring.num_classes;
        let e = &self.ensemble;
        for (name, len) in [
            ("primary_weights", e.primary_weights.len()),
            ("primary_tau", e.primary_tau.len()),
            ("secondary_tau", e.secondary_tau.len()),
            ("primary_strong", e.primary_strong.len()),
            ("secondary_strong", e.secondary_strong.len()),
        ] {
            if len != n {
                return Err(ConfigError::ValidationError(format!(
                    "ensemble.{name} has {len} entries but scoring.num_classes is {n}"
                )));
            }
        }
        if e.primary_weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return Err(ConfigError::ValidationError(
                "ensemble.primary_weights entries must be between 0.0 and 1.0".into(),
            ));
        }
        if e.primary_tau
            .iter()
            .chain(e.secondary_tau.iter())
            .any(|t| !(0.0..=1.0).contains(t))
        {
            return Err(ConfigError::ValidationError(
                "ensemble tau entries must be between 0.0 and 1.0".into(),
            ));
        }
        if e.mode != "calibrated" && e.mode != "dynamic" {
            return Err(ConfigError::ValidationError(format!(
                "ensemble.mode must be \"calibrated\" or \"dynamic\", got \"{}\"",
                e.mode
            )));
        }

        if !(0.0..=1.0).contains(&self.fusion.top_weight) {
            return Err(ConfigError::ValidationError(
                "fusion.top_weight must be between 0.0 and 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.fusion.prior_strength) {
            return Err(ConfigError::ValidationError(
                "fusion.prior_strength must be between 0.0 and 1.0".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = Config::default();
        config.index.top_k = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn test_validate_rejects_zero_temperature() {
        let mut config = Config::default();
        config
            .scoring
            .temperatures
            .insert("convnext".to_string(), 0.0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temperatures.convnext"));
    }

    #[test]
    fn test_validate_rejects_mismatched_class_tables() {
        let mut config = Config::default();
        config.scoring.num_classes = 5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("num_classes"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_weight() {
        let mut config = Config::default();
        config.ensemble.primary_weights[0] = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("primary_weights"));
    }

    #[test]
    fn test_validate_rejects_unknown_ensemble_mode() {
        let mut config = Config::default();
        config.ensemble.mode = "vote".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ensemble.mode"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_top_weight() {
        let mut config = Config::default();
        config.fusion.top_weight = -0.1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("top_weight"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.query_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("query_timeout_ms"));
    }
}
