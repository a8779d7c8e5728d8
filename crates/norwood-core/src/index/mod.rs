//! Vector index seam: the k-NN retrieval backends.
//!
//! Defines the interface every index backend implements, plus the factory
//! that creates the right backend from config. The hosted backend speaks
//! a Pinecone-style HTTP API; the in-memory backend exists for tests and
//! offline evaluation against a local reference set.

pub mod memory;
pub mod pinecone;

use async_trait::async_trait;

use crate::config::{resolve_env_var, IndexConfig};
use crate::error::AnalysisError;
use crate::types::IndexMatch;

pub use memory::MemoryIndex;
pub use pinecone::PineconeIndex;

/// Trait that all vector index backends implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn VectorIndex>` for dynamic dispatch).
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name for logging (e.g., "pinecone", "memory").
    fn name(&self) -> &str;

    /// Retrieve the `top_k` nearest neighbors of a query vector, with
    /// metadata, ordered by descending similarity.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, AnalysisError>;
}

/// Factory that creates an index backend for one model's endpoint.
pub struct IndexFactory;

impl IndexFactory {
    /// Create the index backend serving `model` from the config.
    ///
    /// The endpoint is looked up under `index.endpoints.<model>`.
    pub fn create(model: &str, config: &IndexConfig) -> Result<Box<dyn VectorIndex>, AnalysisError> {
        match config.provider.as_str() {
            "pinecone" => {
                let endpoint =
                    config
                        .endpoints
                        .get(model)
                        .ok_or_else(|| AnalysisError::Index {
                            message: format!(
                                "No index endpoint configured for model \"{model}\". \
                                 Add it under [index.endpoints] in the config."
                            ),
                            status_code: None,
                        })?;
                let api_key =
                    resolve_env_var(&config.api_key).ok_or_else(|| AnalysisError::Index {
                        message: "Index API key not set. Set PINECONE_API_KEY env var."
                            .to_string(),
                        status_code: None,
                    })?;
                Ok(Box::new(PineconeIndex::new(
                    endpoint,
                    &api_key,
                    config.namespace.clone(),
                )))
            }
            "memory" => Ok(Box::new(MemoryIndex::new())),
            other => Err(AnalysisError::Index {
                message: format!("Unknown index provider: {other}"),
                status_code: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let mut config = IndexConfig::default();
        config.provider = "faiss".to_string();
        let err = IndexFactory::create("convnext", &config).err().unwrap();
        assert!(err.to_string().contains("Unknown index provider"));
    }

    #[test]
    fn test_factory_requires_endpoint() {
        let mut config = IndexConfig::default();
        config.api_key = "key".to_string();
        let err = IndexFactory::create("convnext", &config).err().unwrap();
        assert!(err.to_string().contains("No index endpoint"));
    }

    #[test]
    fn test_factory_memory_provider() {
        let mut config = IndexConfig::default();
        config.provider = "memory".to_string();
        let index = IndexFactory::create("convnext", &config).unwrap();
        assert_eq!(index.name(), "memory");
    }
}
