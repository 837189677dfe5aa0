//! Vector Search Client
//!
//! Consumed interface to the external vector index. One call is exactly one
//! round-trip; index failures are surfaced as `RetrievalError` so upstream
//! stages can decide whether to proceed with partial results. No retries
//! happen at this layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ragline_core::document::{MetadataFilter, RankedList, SearchRequest};

/// Errors from the external vector index.
#[derive(Error, Debug, Clone)]
pub enum RetrievalError {
    /// The index rejected or failed the query
    #[error("Index error: {0}")]
    Index(String),

    /// The index did not respond in time
    #[error("Index timeout: {0}")]
    Timeout(String),

    /// The index is unreachable
    #[error("Index unavailable: {0}")]
    Unavailable(String),
}

/// A similarity-search client against one external vector index.
///
/// Implementations execute exactly one round-trip per call and return
/// documents ranked best-first, already filtered by the request's
/// similarity floor and metadata filter.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Run one similarity search.
    async fn search(&self, request: &SearchRequest) -> Result<RankedList, RetrievalError>;
}

/// Per-query retrieval parameters applied to every expanded query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Documents requested per expanded query.
    pub top_k: usize,
    /// Minimum similarity score (0.0 to 1.0).
    pub similarity_floor: f32,
    /// Optional metadata filter applied by the index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<MetadataFilter>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 8,
            similarity_floor: 0.0,
            filter: None,
        }
    }
}

impl RetrievalConfig {
    /// Build the request for one expanded query.
    pub fn request(&self, query: &str) -> SearchRequest {
        let mut request = SearchRequest::new(query, self.top_k)
            .with_similarity_floor(self.similarity_floor);
        if let Some(filter) = &self.filter {
            request = request.with_filter(filter.clone());
        }
        request
    }
}
