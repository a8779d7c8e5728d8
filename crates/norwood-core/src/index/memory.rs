//! In-memory brute-force index for tests and offline evaluation.
//!
//! Vectors are L2-normalized at insert so the query-time dot product is
//! cosine similarity.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::AnalysisError;
use crate::math::l2_normalize;
use crate::types::IndexMatch;

use super::VectorIndex;

struct Entry {
    id: String,
    vector: Vec<f32>,
    metadata: Map<String, Value>,
}

/// Brute-force cosine index over an in-memory reference set.
#[derive(Default)]
pub struct MemoryIndex {
    entries: Vec<Entry>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vector with metadata. The vector is normalized on the way in.
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        vector: &[f32],
        metadata: Map<String, Value>,
    ) {
        self.entries.push(Entry {
            id: id.into(),
            vector: l2_normalize(vector),
            metadata,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, AnalysisError> {
        let query = l2_normalize(vector);

        let mut matches: Vec<IndexMatch> = self
            .entries
            .iter()
            .map(|entry| {
                let score: f32 = entry
                    .vector
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| a * b)
                    .sum();
                IndexMatch {
                    id: entry.id.clone(),
                    score,
                    metadata: entry.metadata.clone(),
                }
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stage_meta(stage: u32) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("stage".to_string(), json!(stage));
        m
    }

    #[tokio::test]
    async fn test_query_returns_nearest_first() {
        let mut index = MemoryIndex::new();
        index.insert("far", &[0.0, 1.0], stage_meta(1));
        index.insert("near", &[1.0, 0.05], stage_meta(3));

        let matches = index.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(matches[0].id, "near");
        assert!(matches[0].score > matches[1].score);
    }

    #[tokio::test]
    async fn test_query_truncates_to_top_k() {
        let mut index = MemoryIndex::new();
        for i in 0..10 {
            index.insert(format!("v{i}"), &[1.0, i as f32 * 0.1], stage_meta(1));
        }
        let matches = index.query(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(matches.len(), 3);
    }

    #[tokio::test]
    async fn test_query_empty_index() {
        let index = MemoryIndex::new();
        let matches = index.query(&[1.0, 0.0], 5).await.unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_scores_are_cosine() {
        let mut index = MemoryIndex::new();
        // Not unit length at insert; normalization happens internally
        index.insert("aligned", &[5.0, 0.0], stage_meta(2));
        index.insert("orthogonal", &[0.0, 3.0], stage_meta(4));

        let matches = index.query(&[2.0, 0.0], 2).await.unwrap();
        assert!((matches[0].score - 1.0).abs() < 1e-6);
        assert!(matches[1].score.abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_metadata_carried_through() {
        let mut index = MemoryIndex::new();
        index.insert("v1", &[1.0], stage_meta(5));
        let matches = index.query(&[1.0], 1).await.unwrap();
        assert_eq!(matches[0].metadata.get("stage"), Some(&json!(5)));
    }
}
