//! Norwood Core - Scalp image stage analysis library.
//!
//! Norwood classifies scalp/hair-loss images into stages by combining
//! pretrained-backbone embeddings with k-NN retrieval over reference
//! vector indexes, then fusing the per-model probability distributions
//! into a single staged prediction with an optional LLM narrative.
//!
//! # Architecture
//!
//! ```text
//! Image(s) → Decode → Embed (ONNX backbone) → Index k-NN query
//!          → Score (softmax-weighted voting) → Ensemble / view fusion
//!          → Stage + confidence → optional LLM narrative → JSON
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use norwood_core::analysis::{ModelSlot, StageAnalyzer};
//! use norwood_core::embedding::EmbeddingEngine;
//! use norwood_core::{Config, PatientProfile};
//!
//! #[tokio::main]
//! async fn main() -> norwood_core::Result<()> {
//!     let config = Config::load()?;
//!     let engine = EmbeddingEngine::load(&config, &["convnext", "vit"])?;
//!     let primary = ModelSlot::from_config("convnext", "convnext", &engine, &config)?;
//!     let secondary = ModelSlot::from_config("vit", "vit", &engine, &config)?;
//!
//!     let analyzer = StageAnalyzer::new(config);
//!     let record = analyzer
//!         .analyze_single("./crown.jpg".as_ref(), &Default::default(), &primary, &secondary)
//!         .await?;
//!     println!("Stage {} ({:.0}%)", record.prediction.stage, record.prediction.confidence * 100.0);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod analysis;
pub mod config;
pub mod embedding;
pub mod error;
pub mod hash;
pub mod index;
pub mod llm;
pub mod math;
pub mod output;
pub mod scoring;
pub mod types;

// Re-exports for convenient access
pub use analysis::{ModelSlot, StageAnalyzer};
pub use config::Config;
pub use embedding::{EmbeddingEngine, ImageEncoder};
pub use error::{AnalysisError, ConfigError, NorwoodError, Result};
pub use index::VectorIndex;
pub use output::{OutputFormat, OutputWriter};
pub use types::{AnalysisRecord, AnalysisStats, IndexMatch, PatientProfile, StagePrediction};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config_accessible() {
        let config = Config::default();
        assert_eq!(config.scoring.num_classes, 7);
    }
}
