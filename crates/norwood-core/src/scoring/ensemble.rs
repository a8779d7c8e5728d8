//! Two-model ensemble fusion and stage prediction.
//!
//! Two strategies are supported, selected by `ensemble.mode`:
//!
//! - **calibrated**: fixed per-class weights learned offline, with an
//!   override: when a model is flagged strong for a class and its raw
//!   probability clears the learned threshold, that raw probability
//!   replaces the weighted blend for the class.
//! - **dynamic**: each model is weighted by its peak confidence.

use serde::{Deserialize, Serialize};

use crate::math::renormalize_in_place;
use crate::types::StagePrediction;

/// Number of classes the default calibration tables cover.
const DEFAULT_CLASSES: usize = 7;

/// Two-model ensemble settings with per-class calibration tables.
///
/// All vectors are indexed by class (index 0 = first stage) and must have
/// `scoring.num_classes` entries; config validation enforces this.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Fusion strategy: "calibrated" or "dynamic"
    pub mode: String,

    /// Per-class weight of the primary model; the secondary model gets
    /// the remainder
    pub primary_weights: Vec<f32>,

    /// Per-class override thresholds for the primary model; 0 disables
    pub primary_tau: Vec<f32>,

    /// Per-class override thresholds for the secondary model; 0 disables
    pub secondary_tau: Vec<f32>,

    /// Classes the primary model is considered strong on
    pub primary_strong: Vec<bool>,

    /// Classes the secondary model is considered strong on
    pub secondary_strong: Vec<bool>,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            mode: "calibrated".to_string(),
            primary_weights: vec![0.5; DEFAULT_CLASSES],
            primary_tau: vec![0.0; DEFAULT_CLASSES],
            secondary_tau: vec![0.0; DEFAULT_CLASSES],
            primary_strong: vec![false; DEFAULT_CLASSES],
            secondary_strong: vec![false; DEFAULT_CLASSES],
        }
    }
}

/// Fuse two per-class distributions according to the configured strategy.
///
/// Both inputs must have the same length as the config tables. The output
/// is renormalized to sum to 1 (or stays the zero vector when both inputs
/// carry no mass).
pub fn fuse(primary: &[f32], secondary: &[f32], config: &EnsembleConfig) -> Vec<f32> {
    match config.mode.as_str() {
        "dynamic" => fuse_dynamic(primary, secondary),
        _ => fuse_calibrated(primary, secondary, config),
    }
}

/// Fixed per-class weights with strong-model override.
fn fuse_calibrated(primary: &[f32], secondary: &[f32], config: &EnsembleConfig) -> Vec<f32> {
    let mut fused = Vec::with_capacity(primary.len());

    for c in 0..primary.len() {
        let w = config.primary_weights[c];
        let blended = w * primary[c] + (1.0 - w) * secondary[c];

        // The primary model's override wins when both qualify.
        let value = if config.primary_strong[c]
            && config.primary_tau[c] > 0.0
            && primary[c] >= config.primary_tau[c]
        {
            primary[c]
        } else if config.secondary_strong[c]
            && config.secondary_tau[c] > 0.0
            && secondary[c] >= config.secondary_tau[c]
        {
            secondary[c]
        } else {
            blended
        };
        fused.push(value);
    }

    renormalize_in_place(&mut fused);
    fused
}

/// Confidence-weighted fusion: each model weighted by its peak probability.
fn fuse_dynamic(primary: &[f32], secondary: &[f32]) -> Vec<f32> {
    let max_p = primary.iter().cloned().fold(0.0f32, f32::max);
    let max_s = secondary.iter().cloned().fold(0.0f32, f32::max);

    let w_primary = if max_p + max_s > f32::EPSILON {
        max_p / (max_p + max_s)
    } else {
        0.5
    };

    let mut fused: Vec<f32> = primary
        .iter()
        .zip(secondary.iter())
        .map(|(p, s)| w_primary * p + (1.0 - w_primary) * s)
        .collect();
    renormalize_in_place(&mut fused);
    fused
}

/// Take the staged prediction off a fused distribution.
///
/// Ties resolve to the lowest class index, so equal mass predicts the
/// earlier stage.
pub fn predict(probs: &[f32], stage_offset: u32) -> StagePrediction {
    let mut best = 0usize;
    let mut best_p = f32::NEG_INFINITY;
    for (i, p) in probs.iter().enumerate() {
        if *p > best_p {
            best = i;
            best_p = *p;
        }
    }

    StagePrediction {
        stage: best as u32 + stage_offset,
        confidence: if probs.is_empty() { 0.0 } else { best_p },
        probs: probs.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(n: usize) -> EnsembleConfig {
        EnsembleConfig {
            mode: "calibrated".to_string(),
            primary_weights: vec![0.5; n],
            primary_tau: vec![0.0; n],
            secondary_tau: vec![0.0; n],
            primary_strong: vec![false; n],
            secondary_strong: vec![false; n],
        }
    }

    #[test]
    fn test_calibrated_sums_to_one() {
        let fused = fuse(&[0.2, 0.5, 0.3], &[0.1, 0.1, 0.8], &config(3));
        assert!((fused.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_calibrated_equal_weights_average() {
        let fused = fuse(&[0.6, 0.4, 0.0], &[0.2, 0.4, 0.4], &config(3));
        assert!((fused[0] - 0.4).abs() < 1e-6);
        assert!((fused[1] - 0.4).abs() < 1e-6);
        assert!((fused[2] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_override_exact_before_renormalization() {
        let mut cfg = config(3);
        cfg.primary_strong[2] = true;
        cfg.primary_tau[2] = 0.6;

        let primary = [0.1, 0.2, 0.7];
        let secondary = [0.5, 0.4, 0.1];

        // Reproduce the pre-renormalization vector: class 2 must carry the
        // primary's raw probability, the others the weighted blend.
        let expected_raw = [
            0.5 * 0.1 + 0.5 * 0.5,
            0.5 * 0.2 + 0.5 * 0.4,
            0.7f32, // override
        ];
        let sum: f32 = expected_raw.iter().sum();

        let fused = fuse(&primary, &secondary, &cfg);
        for (f, e) in fused.iter().zip(expected_raw.iter()) {
            assert!((f - e / sum).abs() < 1e-6);
        }
    }

    #[test]
    fn test_override_not_triggered_below_tau() {
        let mut cfg = config(3);
        cfg.primary_strong[2] = true;
        cfg.primary_tau[2] = 0.9;

        let fused = fuse(&[0.1, 0.2, 0.7], &[0.4, 0.4, 0.2], &cfg);
        // 0.7 < 0.9: plain blend at class 2
        let blended = 0.5 * 0.7 + 0.5 * 0.2;
        let raw = [0.5 * 0.1 + 0.5 * 0.4, 0.5 * 0.2 + 0.5 * 0.4, blended];
        let sum: f32 = raw.iter().sum();
        assert!((fused[2] - blended / sum).abs() < 1e-6);
    }

    #[test]
    fn test_override_requires_strong_flag() {
        let mut cfg = config(3);
        // tau set but strong flag off: no override
        cfg.primary_tau[0] = 0.1;

        let fused = fuse(&[0.8, 0.1, 0.1], &[0.0, 0.5, 0.5], &cfg);
        let raw = [0.4, 0.3, 0.3];
        assert!((fused[0] - raw[0]).abs() < 1e-6);
    }

    #[test]
    fn test_primary_override_wins_over_secondary() {
        let mut cfg = config(2);
        cfg.primary_strong = vec![true, false];
        cfg.primary_tau = vec![0.5, 0.0];
        cfg.secondary_strong = vec![true, false];
        cfg.secondary_tau = vec![0.5, 0.0];

        let fused = fuse(&[0.7, 0.3], &[0.9, 0.1], &cfg);
        // Both qualify at class 0; primary's 0.7 is taken.
        let raw = [0.7, 0.5 * 0.3 + 0.5 * 0.1];
        let sum: f32 = raw.iter().sum();
        assert!((fused[0] - raw[0] / sum).abs() < 1e-6);
    }

    #[test]
    fn test_dynamic_weights_by_peak_confidence() {
        let mut cfg = config(2);
        cfg.mode = "dynamic".to_string();

        let primary = [0.9, 0.1];
        let secondary = [0.3, 0.7];
        let fused = fuse(&primary, &secondary, &cfg);

        // w_primary = 0.9 / (0.9 + 0.7) = 0.5625
        let w: f32 = 0.9 / 1.6;
        let raw = [w * 0.9 + (1.0 - w) * 0.3, w * 0.1 + (1.0 - w) * 0.7];
        let sum: f32 = raw.iter().sum();
        assert!((fused[0] - raw[0] / sum).abs() < 1e-6);
        assert!((fused.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dynamic_zero_mass_falls_back_to_equal_weights() {
        let mut cfg = config(2);
        cfg.mode = "dynamic".to_string();
        let fused = fuse(&[0.0, 0.0], &[0.0, 0.0], &cfg);
        assert_eq!(fused, vec![0.0, 0.0]);
    }

    #[test]
    fn test_predict_argmax_plus_offset() {
        let prediction = predict(&[0.1, 0.2, 0.6, 0.1], 1);
        assert_eq!(prediction.stage, 3);
        assert!((prediction.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_predict_tie_resolves_to_lower_stage() {
        let prediction = predict(&[0.4, 0.4, 0.2], 1);
        assert_eq!(prediction.stage, 1);
    }

    #[test]
    fn test_fusion_idempotent() {
        let cfg = config(3);
        let a = [0.3, 0.3, 0.4];
        let b = [0.5, 0.25, 0.25];
        assert_eq!(fuse(&a, &b, &cfg), fuse(&a, &b, &cfg));
    }
}
