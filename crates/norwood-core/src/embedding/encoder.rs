//! ONNX Runtime session management for backbone inference.
//!
//! Loads a visual encoder exported to ONNX and runs inference to produce
//! an L2-normalized embedding vector. Input and output tensor names are
//! detected from model metadata, so differently-exported backbones load
//! without per-model code.

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use crate::config::BackboneConfig;
use crate::error::AnalysisError;

use super::preprocess::{preprocess, NormPreset};
use super::{EmbeddingEngine, ImageEncoder};

/// Wraps an ONNX Runtime session for one embedding backbone.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct OnnxEncoder {
    name: String,
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
    image_size: u32,
    preset: NormPreset,
}

impl OnnxEncoder {
    /// Load a backbone's visual encoder from the model directory.
    pub fn load(
        name: &str,
        backbone: &BackboneConfig,
        model_dir: &Path,
    ) -> Result<Self, AnalysisError> {
        let model_path = EmbeddingEngine::model_path(backbone, model_dir);

        if !model_path.exists() {
            return Err(AnalysisError::Embedding {
                path: model_path,
                message: format!(
                    "Model for backbone \"{name}\" not found. \
                     Place the exported visual.onnx under the model directory."
                ),
            });
        }

        let preset = NormPreset::parse(&backbone.normalization).ok_or_else(|| {
            AnalysisError::Embedding {
                path: model_path.clone(),
                message: format!(
                    "Unknown normalization preset \"{}\" for backbone \"{name}\"",
                    backbone.normalization
                ),
            }
        })?;

        tracing::info!("Loading {name} backbone from {:?}", model_path);
        let session = Session::builder()
            .map_err(|e| AnalysisError::Embedding {
                path: model_path.clone(),
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(&model_path)
            .map_err(|e| AnalysisError::Embedding {
                path: model_path.clone(),
                message: format!("Failed to load ONNX model: {e}"),
            })?;

        // Detect the input tensor name from model metadata.
        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "pixel_values".to_string());

        tracing::debug!(
            "Loaded {name} (input: {:?}, outputs: {:?})",
            input_name,
            session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>()
        );

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            image_size: backbone.image_size,
            preset,
        })
    }

    /// Run inference on a preprocessed tensor and return the embedding.
    ///
    /// Input shape: \[1, 3, image_size, image_size\] (NCHW). The first
    /// output tensor is taken as the embedding; the exported encoders
    /// end at the pooled feature projection.
    fn run(&self, preprocessed: &Array4<f32>, path: &Path) -> Result<Vec<f32>, AnalysisError> {
        // Convert ndarray to (shape, flat_data) for ort.
        let shape: Vec<i64> = preprocessed.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = preprocessed.iter().copied().collect();

        let input_value =
            Value::from_array((shape, flat_data)).map_err(|e| AnalysisError::Embedding {
                path: path.to_path_buf(),
                message: format!("Failed to create input tensor: {e}"),
            })?;

        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self.session.lock().map_err(|e| AnalysisError::Embedding {
            path: path.to_path_buf(),
            message: format!("Session lock poisoned: {e}"),
        })?;

        let outputs = session.run(inputs).map_err(|e| AnalysisError::Embedding {
            path: path.to_path_buf(),
            message: format!("ONNX inference failed: {e}"),
        })?;

        let (_, output) = outputs.iter().next().ok_or_else(|| AnalysisError::Embedding {
            path: path.to_path_buf(),
            message: "Model produced no outputs".to_string(),
        })?;

        let (shape, data) =
            output
                .try_extract_tensor::<f32>()
                .map_err(|e| AnalysisError::Embedding {
                    path: path.to_path_buf(),
                    message: format!("Failed to extract output tensor: {e}"),
                })?;

        // Output is [1, D] (or flat [D]). Extract the single embedding vector.
        let mut raw = match shape.len() {
            1 => data.to_vec(),
            2 => {
                let dim = shape[1] as usize;
                data[..dim].to_vec()
            }
            _ => {
                return Err(AnalysisError::Embedding {
                    path: path.to_path_buf(),
                    message: format!("Unexpected output shape: {:?}", shape),
                });
            }
        };

        crate::math::l2_normalize_in_place(&mut raw);
        Ok(raw)
    }
}

impl ImageEncoder for OnnxEncoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn embed(&self, image: &DynamicImage, path: &Path) -> Result<Vec<f32>, AnalysisError> {
        let tensor = preprocess(image, self.image_size, self.preset);
        self.run(&tensor, path)
    }
}
