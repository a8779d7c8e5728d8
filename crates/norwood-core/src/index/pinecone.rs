//! Pinecone-style HTTP index backend.
//!
//! Sends `POST {endpoint}/query` with the query vector and reads matches
//! (id, score, metadata) from the JSON response.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AnalysisError;
use crate::types::IndexMatch;

use super::VectorIndex;

/// Hosted vector index speaking the Pinecone query API.
pub struct PineconeIndex {
    endpoint: String,
    api_key: String,
    namespace: Option<String>,
    client: reqwest::Client,
}

impl PineconeIndex {
    pub fn new(endpoint: &str, api_key: &str, namespace: Option<String>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            namespace,
            client: reqwest::Client::new(),
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

// --- Response types ---

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<IndexMatch>,
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, AnalysisError> {
        let start = Instant::now();

        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };

        let resp = self
            .client
            .post(format!("{}/query", self.endpoint))
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Index {
                message: format!("Index request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AnalysisError::Index {
                message: format!("Index HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let query_resp: QueryResponse = resp.json().await.map_err(|e| AnalysisError::Index {
            message: format!("Failed to parse index response: {e}"),
            status_code: None,
        })?;

        tracing::debug!(
            "Index query returned {} matches in {:?}",
            query_resp.matches.len(),
            start.elapsed()
        );

        Ok(query_resp.matches)
    }
}
