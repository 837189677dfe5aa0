//! Retrieval Value Types
//!
//! Documents, search requests, and metadata filters shared between the
//! pipeline crate and any vector-index adapter. A `Document` is the
//! immutable retrieved unit; rank-fusion and rerank stages annotate copies
//! rather than mutating these values in place.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Arbitrary key -> value metadata attached to a document.
pub type Metadata = HashMap<String, serde_json::Value>;

/// An ordered result list; rank is the 1-based position.
pub type RankedList = Vec<Document>;

/// A single retrieved unit of corpus text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable document identity (opaque id).
    pub id: String,
    /// Text body of the document.
    pub text: String,
    /// Similarity score on the producing source's own scale.
    pub score: f32,
    /// Arbitrary metadata carried from the index.
    #[serde(default)]
    pub metadata: Metadata,
    /// Which expanded query produced this document, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_query: Option<String>,
}

impl Document {
    /// Create a document with empty metadata and no provenance tag.
    pub fn new(id: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            score,
            metadata: Metadata::new(),
            source_query: None,
        }
    }

    /// Builder-style setter for the provenance tag.
    pub fn with_source_query(mut self, query: impl Into<String>) -> Self {
        self.source_query = Some(query.into());
        self
    }
}

/// Boolean filter tree over document metadata keys.
///
/// Evaluated by the external index; `matches` is provided so in-process
/// implementations (and test fixtures) can apply the same semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MetadataFilter {
    /// Metadata value at `key` equals `value`.
    Eq {
        key: String,
        value: serde_json::Value,
    },
    /// Metadata value at `key` differs from `value` (missing keys match).
    Ne {
        key: String,
        value: serde_json::Value,
    },
    /// All child filters match.
    And { filters: Vec<MetadataFilter> },
    /// At least one child filter matches.
    Or { filters: Vec<MetadataFilter> },
    /// The child filter does not match.
    Not { filter: Box<MetadataFilter> },
}

impl MetadataFilter {
    /// Evaluate the filter against a metadata map.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            MetadataFilter::Eq { key, value } => metadata.get(key) == Some(value),
            MetadataFilter::Ne { key, value } => metadata.get(key) != Some(value),
            MetadataFilter::And { filters } => filters.iter().all(|f| f.matches(metadata)),
            MetadataFilter::Or { filters } => filters.iter().any(|f| f.matches(metadata)),
            MetadataFilter::Not { filter } => !filter.matches(metadata),
        }
    }

    /// Canonical string form used when deriving cache keys.
    ///
    /// The serde representation is deterministic (tagged enum, ordered
    /// vectors), so serializing is sufficient as a signature.
    pub fn signature(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A similarity-search request against the external vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query text.
    pub query: String,
    /// Maximum number of documents to return.
    pub top_k: usize,
    /// Minimum similarity score (0.0 to 1.0) for inclusion.
    #[serde(default)]
    pub similarity_floor: f32,
    /// Optional metadata filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<MetadataFilter>,
}

impl SearchRequest {
    /// Create a request with no similarity floor and no filter.
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            similarity_floor: 0.0,
            filter: None,
        }
    }

    /// Builder-style setter for the similarity floor.
    pub fn with_similarity_floor(mut self, floor: f32) -> Self {
        self.similarity_floor = floor;
        self
    }

    /// Builder-style setter for the metadata filter.
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Validate request bounds.
    ///
    /// `top_k` must be positive and the similarity floor must lie in
    /// `[0.0, 1.0]`.
    pub fn validate(&self) -> crate::error::CoreResult<()> {
        if self.top_k == 0 {
            return Err(crate::error::CoreError::validation("top_k must be positive"));
        }
        if !(0.0..=1.0).contains(&self.similarity_floor) {
            return Err(crate::error::CoreError::validation(format!(
                "similarity_floor must be within [0.0, 1.0], got {}",
                self.similarity_floor
            )));
        }
        Ok(())
    }
}
