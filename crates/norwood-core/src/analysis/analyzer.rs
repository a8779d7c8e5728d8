//! Pipeline orchestration - wires decode, embedding, retrieval, and scoring.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::embedding::{EmbeddingEngine, ImageEncoder};
use crate::error::{AnalysisError, AnalysisResult};
use crate::hash;
use crate::index::{IndexFactory, VectorIndex};
use crate::scoring::{self, RetrievalScore};
use crate::types::{AnalysisRecord, ModelScore, PatientProfile};

use super::decode::{DecodedImage, ImageDecoder};

/// One model's encoder paired with its vector index.
///
/// Single-view analysis uses two slots (primary + secondary ensemble);
/// dual-view analysis uses one slot per viewpoint. `model` is the
/// backbone name (drives the softmax temperature); `label` is the
/// reporting name, which for view slots carries the viewpoint suffix
/// ("swin_top").
pub struct ModelSlot {
    /// Short backbone name ("convnext", "vit", "swin")
    pub model: String,
    /// Reporting name; also the index endpoint key
    pub label: String,
    pub encoder: Arc<dyn ImageEncoder>,
    pub index: Box<dyn VectorIndex>,
}

impl ModelSlot {
    /// Build a slot from config: the named backbone plus the index
    /// endpoint registered under `endpoint_key`.
    pub fn from_config(
        model: &str,
        endpoint_key: &str,
        engine: &EmbeddingEngine,
        config: &Config,
    ) -> AnalysisResult<Self> {
        Ok(Self {
            model: model.to_string(),
            label: endpoint_key.to_string(),
            encoder: engine.encoder(model)?,
            index: IndexFactory::create(endpoint_key, &config.index)?,
        })
    }
}

/// The main analyzer that orchestrates the full pipeline.
pub struct StageAnalyzer {
    config: Config,
    decoder: ImageDecoder,
}

impl StageAnalyzer {
    /// Create a new analyzer with the given configuration.
    pub fn new(config: Config) -> Self {
        let decoder = ImageDecoder::new(config.limits.clone());
        Self { config, decoder }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze a single image with the two-model ensemble.
    pub async fn analyze_single(
        &self,
        path: &Path,
        profile: &PatientProfile,
        primary: &ModelSlot,
        secondary: &ModelSlot,
    ) -> AnalysisResult<AnalysisRecord> {
        let start = std::time::Instant::now();
        tracing::debug!("Analyzing: {:?}", path);

        let (decoded, content_hash) = self.load_and_decode(path).await?;

        let primary_score = self.score_with_slot(primary, &decoded, path).await?;
        let secondary_score = self.score_with_slot(secondary, &decoded, path).await?;

        let fused = scoring::fuse(
            &primary_score.probs,
            &secondary_score.probs,
            &self.config.ensemble,
        );
        let prediction = scoring::predict(&fused, self.config.scoring.stage_offset);

        tracing::debug!(
            "Analyzed {:?} in {:?} -> stage {} ({:.1}%)",
            path.file_name().unwrap_or_default(),
            start.elapsed(),
            prediction.stage,
            prediction.confidence * 100.0
        );

        Ok(self.build_record(
            path,
            None,
            content_hash,
            vec![
                (primary.label.clone(), primary_score),
                (secondary.label.clone(), secondary_score),
            ],
            prediction,
            profile,
        ))
    }

    /// Analyze a top + side image pair with per-view scoring and late fusion.
    pub async fn analyze_dual(
        &self,
        top_path: &Path,
        side_path: &Path,
        profile: &PatientProfile,
        top: &ModelSlot,
        side: &ModelSlot,
    ) -> AnalysisResult<AnalysisRecord> {
        let start = std::time::Instant::now();
        tracing::debug!("Analyzing pair: {:?} + {:?}", top_path, side_path);

        let (top_decoded, content_hash) = self.load_and_decode(top_path).await?;
        let (side_decoded, _) = self.load_and_decode(side_path).await?;

        let top_score = self.score_with_slot(top, &top_decoded, top_path).await?;
        let side_score = self.score_with_slot(side, &side_decoded, side_path).await?;

        let mut fused = scoring::fuse_views(
            &top_score.probs,
            &side_score.probs,
            self.config.fusion.top_weight,
        );

        // Profile prior only enters at view-fusion time, and only when enabled.
        if self.config.fusion.prior_strength > 0.0 && !profile.is_empty() {
            let prior = scoring::profile_prior(profile, self.config.scoring.num_classes);
            fused = scoring::apply_prior(&fused, &prior, self.config.fusion.prior_strength);
        }

        let prediction = scoring::predict(&fused, self.config.scoring.stage_offset);

        tracing::debug!(
            "Analyzed pair in {:?} -> stage {} ({:.1}%)",
            start.elapsed(),
            prediction.stage,
            prediction.confidence * 100.0
        );

        Ok(self.build_record(
            top_path,
            Some(side_path),
            content_hash,
            vec![
                (top.label.clone(), top_score),
                (side.label.clone(), side_score),
            ],
            prediction,
            profile,
        ))
    }

    /// Read, hash, validate, and decode one image file.
    async fn load_and_decode(&self, path: &Path) -> AnalysisResult<(DecodedImage, String)> {
        self.decoder.validate(path)?;

        let bytes = tokio::fs::read(path).await.map_err(|e| AnalysisError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot read file: {}", e),
        })?;
        let content_hash = hash::content_hash_from_bytes(&bytes);
        let decoded = self.decoder.decode_from_bytes(bytes, path).await?;
        Ok((decoded, content_hash))
    }

    /// Embed with one slot's backbone, query its index, convert to probs.
    async fn score_with_slot(
        &self,
        slot: &ModelSlot,
        decoded: &DecodedImage,
        path: &Path,
    ) -> AnalysisResult<RetrievalScore> {
        let embed_start = std::time::Instant::now();
        let embedding = slot.encoder.embed(&decoded.image, path)?;
        tracing::trace!("  Embed [{}]: {:?}", slot.label, embed_start.elapsed());

        let query_start = std::time::Instant::now();
        let matches = tokio::time::timeout(
            Duration::from_millis(self.config.limits.query_timeout_ms),
            slot.index.query(&embedding, self.config.index.top_k),
        )
        .await
        .map_err(|_| AnalysisError::Timeout {
            stage: "query".to_string(),
            timeout_ms: self.config.limits.query_timeout_ms,
        })??;
        tracing::trace!(
            "  Query [{}]: {} matches in {:?}",
            slot.label,
            matches.len(),
            query_start.elapsed()
        );

        let score = scoring::score_matches(
            &matches,
            self.config.scoring.num_classes,
            self.config.scoring.temperature_for(&slot.model),
        );

        if score.matches_used == 0 {
            return Err(AnalysisError::Scoring {
                model: slot.label.clone(),
                message: format!(
                    "Index returned {} matches but none carried a usable stage label",
                    matches.len()
                ),
            });
        }

        Ok(score)
    }

    fn build_record(
        &self,
        path: &Path,
        side_path: Option<&Path>,
        content_hash: String,
        scores: Vec<(String, RetrievalScore)>,
        prediction: crate::types::StagePrediction,
        profile: &PatientProfile,
    ) -> AnalysisRecord {
        let model_scores = if self.config.output.include_distributions {
            scores
                .into_iter()
                .map(|(model, score)| ModelScore {
                    model,
                    probs: score.probs,
                    matches_used: score.matches_used,
                })
                .collect()
        } else {
            vec![]
        };

        AnalysisRecord {
            file_path: path.to_path_buf(),
            side_path: side_path.map(|p| p.to_path_buf()),
            content_hash,
            model_scores,
            prediction,
            profile: (!profile.is_empty()).then(|| profile.clone()),
            narrative: None,
        }
    }
}
