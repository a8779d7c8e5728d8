//! Embedding backbone seam.
//!
//! Converts decoded scalp images into L2-normalized embedding vectors
//! using pretrained visual encoders (ConvNeXt, ViT, Swin, CLIP) exported
//! to ONNX and run locally via ONNX Runtime.
//!
//! # Usage
//!
//! ```rust,ignore
//! use norwood_core::embedding::{EmbeddingEngine, ImageEncoder};
//!
//! let config = Config::default();
//! let engine = EmbeddingEngine::load(&config, &["convnext", "vit"])?;
//! let encoder = engine.encoder("convnext")?;
//! let embedding = encoder.embed(&decoded_image, path)?;
//! ```

pub(crate) mod encoder;
pub(crate) mod preprocess;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use crate::config::{BackboneConfig, Config};
use crate::error::AnalysisError;

pub use encoder::OnnxEncoder;
pub use preprocess::NormPreset;

/// The visual encoder ONNX model filename inside each backbone directory.
const VISUAL_MODEL_FILENAME: &str = "visual.onnx";

/// Trait for image embedding backbones.
///
/// The ONNX implementation is the production path; tests substitute stub
/// encoders to drive the pipeline without model files.
pub trait ImageEncoder: Send + Sync {
    /// Short model name ("convnext", "vit", "swin", "clip").
    fn name(&self) -> &str;

    /// Generate an L2-normalized embedding for an image.
    fn embed(&self, image: &DynamicImage, path: &Path) -> Result<Vec<f32>, AnalysisError>;
}

/// Holds the loaded backbones, keyed by short model name.
pub struct EmbeddingEngine {
    encoders: HashMap<String, Arc<dyn ImageEncoder>>,
}

impl EmbeddingEngine {
    /// Load the named backbones.
    ///
    /// Only the models an analysis path actually uses are loaded; a
    /// backbone configured but unused costs nothing.
    pub fn load(config: &Config, models: &[&str]) -> Result<Self, AnalysisError> {
        let model_dir = config.model_dir();

        let mut encoders: HashMap<String, Arc<dyn ImageEncoder>> = HashMap::new();
        for &name in models {
            if encoders.contains_key(name) {
                continue;
            }
            let backbone = config.embedding.backbones.get(name).ok_or_else(|| {
                AnalysisError::Embedding {
                    path: model_dir.clone(),
                    message: format!(
                        "No backbone configured for model \"{name}\". \
                         Add it under [embedding.backbones] in the config."
                    ),
                }
            })?;
            let encoder = OnnxEncoder::load(name, backbone, &model_dir)?;
            encoders.insert(name.to_string(), Arc::new(encoder));
        }

        Ok(Self { encoders })
    }

    /// Build an engine from pre-constructed encoders (test seam).
    pub fn from_encoders(encoders: HashMap<String, Arc<dyn ImageEncoder>>) -> Self {
        Self { encoders }
    }

    /// Look up a loaded encoder by short model name.
    pub fn encoder(&self, name: &str) -> Result<Arc<dyn ImageEncoder>, AnalysisError> {
        self.encoders
            .get(name)
            .cloned()
            .ok_or_else(|| AnalysisError::Embedding {
                path: PathBuf::new(),
                message: format!("Backbone \"{name}\" is not loaded"),
            })
    }

    /// Check whether a backbone's model file exists on disk.
    pub fn model_exists(backbone: &BackboneConfig, model_dir: &Path) -> bool {
        Self::model_path(backbone, model_dir).exists()
    }

    /// Get the expected model file path for a backbone.
    pub fn model_path(backbone: &BackboneConfig, model_dir: &Path) -> PathBuf {
        model_dir.join(&backbone.model).join(VISUAL_MODEL_FILENAME)
    }
}
