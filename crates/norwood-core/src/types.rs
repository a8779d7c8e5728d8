//! Core data types for the Norwood analysis pipeline.
//!
//! These types represent vector index matches, per-model score
//! distributions, and the final serialized analysis record.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which viewpoint a scalp image was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    /// Top-down crown view
    Top,
    /// Hairline / temple side view
    Side,
}

impl ViewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Top => "top",
            ViewKind::Side => "side",
        }
    }
}

/// A single k-NN match returned by a vector index query.
///
/// `score` is cosine similarity in [-1, 1]. The stage label lives
/// somewhere in `metadata` and is extracted robustly by the scoring layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMatch {
    /// Vector id in the index
    pub id: String,

    /// Cosine similarity score
    pub score: f32,

    /// Arbitrary metadata stored alongside the vector
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl IndexMatch {
    /// Create a match with a single string metadata field (test helper shape).
    pub fn with_label(id: impl Into<String>, score: f32, key: &str, label: impl Into<String>) -> Self {
        let mut metadata = serde_json::Map::new();
        metadata.insert(key.to_string(), serde_json::Value::String(label.into()));
        Self {
            id: id.into(),
            score,
            metadata,
        }
    }
}

/// Per-model probability distribution attached to an analysis record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelScore {
    /// Model identifier ("convnext", "vit", "swin")
    pub model: String,

    /// Per-class probabilities, index 0 = first stage
    pub probs: Vec<f32>,

    /// Number of index matches that contributed
    pub matches_used: usize,
}

/// The final staged prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagePrediction {
    /// Predicted stage (class index plus the configured offset)
    pub stage: u32,

    /// Confidence: the max fused probability
    pub confidence: f32,

    /// The fused per-class distribution the prediction was taken from
    pub probs: Vec<f32>,
}

/// Optional patient context used for prior-weighted fusion and narratives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientProfile {
    /// Age in years
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,

    /// Whether there is a family history of hair loss
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_history: Option<bool>,
}

impl PatientProfile {
    pub fn is_empty(&self) -> bool {
        self.age.is_none() && self.family_history.is_none()
    }
}

/// LLM-generated explanation of a staged prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Narrative {
    /// Generated text
    pub text: String,

    /// Model identifier used
    pub llm_model: String,

    /// Round-trip latency in milliseconds
    pub llm_latency_ms: u64,

    /// Number of tokens used (input + output), if reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_tokens: Option<u32>,
}

/// The complete output for one analyzed image (or image pair).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    // === File identification ===
    /// Absolute path to the primary (or top-view) source file
    pub file_path: PathBuf,

    /// Side-view source file for dual-view analyses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side_path: Option<PathBuf>,

    /// BLAKE3 hash of the primary file for content-based identity
    pub content_hash: String,

    // === Scoring ===
    /// Per-model distributions that went into the fusion
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub model_scores: Vec<ModelScore>,

    /// The fused prediction
    pub prediction: StagePrediction,

    // === Context ===
    /// Patient profile, when provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<PatientProfile>,

    /// LLM narrative, when requested and successful
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<Narrative>,
}

/// Statistics for a batch run over a directory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisStats {
    /// Total images analyzed successfully
    pub succeeded: usize,

    /// Total images that failed
    pub failed: usize,

    /// Analysis rate in images per second
    pub images_per_second: f64,

    /// Total wall-clock time in seconds
    pub total_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> AnalysisRecord {
        AnalysisRecord {
            file_path: PathBuf::from("/scans/crown.jpg"),
            side_path: None,
            content_hash: "abc123".to_string(),
            model_scores: vec![ModelScore {
                model: "convnext".to_string(),
                probs: vec![0.1, 0.7, 0.2],
                matches_used: 10,
            }],
            prediction: StagePrediction {
                stage: 2,
                confidence: 0.7,
                probs: vec![0.1, 0.7, 0.2],
            },
            profile: None,
            narrative: None,
        }
    }

    #[test]
    fn test_record_roundtrip() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"content_hash\":\"abc123\""));
        assert!(json.contains("\"stage\":2"));

        let parsed: AnalysisRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.prediction.stage, 2);
        assert_eq!(parsed.model_scores.len(), 1);
    }

    #[test]
    fn test_record_skips_none_fields() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("side_path"));
        assert!(!json.contains("narrative"));
        assert!(!json.contains("profile"));
    }

    #[test]
    fn test_narrative_skips_none_tokens() {
        let narrative = Narrative {
            text: "Early thinning at the crown.".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            llm_latency_ms: 800,
            llm_tokens: None,
        };
        let json = serde_json::to_string(&narrative).unwrap();
        assert!(!json.contains("llm_tokens"));
    }

    #[test]
    fn test_index_match_metadata_defaults_empty() {
        let parsed: IndexMatch = serde_json::from_str(r#"{"id":"v1","score":0.8}"#).unwrap();
        assert!(parsed.metadata.is_empty());
    }

    #[test]
    fn test_view_kind_serde() {
        assert_eq!(serde_json::to_string(&ViewKind::Top).unwrap(), "\"top\"");
        assert_eq!(ViewKind::Side.as_str(), "side");
    }

    #[test]
    fn test_profile_is_empty() {
        assert!(PatientProfile::default().is_empty());
        let profile = PatientProfile {
            age: Some(35),
            family_history: None,
        };
        assert!(!profile.is_empty());
    }
}
