//! Retrieval scoring: from k-NN matches to a staged prediction.
//!
//! This module contains the three layers of the scoring pipeline:
//! - **labels**: robust stage-label extraction from match metadata
//! - **knn**: softmax-weighted conversion of matches to per-class probabilities
//! - **ensemble**: two-model fusion (calibrated or dynamic) and prediction
//! - **fusion**: late fusion across viewpoints and patient-profile priors

pub mod ensemble;
pub mod fusion;
pub mod knn;
pub mod labels;

// Re-exports for convenient access
pub use ensemble::{fuse, predict, EnsembleConfig};
pub use fusion::{apply_prior, fuse_views, profile_prior};
pub use knn::{knn_to_probs, score_matches, RetrievalScore};
pub use labels::stage_label;
