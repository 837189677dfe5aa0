//! Reranker
//!
//! Defines the `Reranker` trait and implementations for reordering fused
//! results by relevance to the original question.
//!
//! - `NoopReranker`: pass-through, preserves fused order (the default)
//! - `KeywordReranker`: keyword-overlap boost on top of the original
//!   similarity score, independent of the generative model
//!
//! Reranking is deterministic and makes no external calls, so the trait is
//! synchronous.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::pipeline::fusion::FusedDocument;

/// Trait for reranking fused results.
pub trait Reranker: Send + Sync {
    /// Rerank results against the original query, returning the reordered
    /// list.
    fn rerank(&self, query: &str, documents: Vec<FusedDocument>) -> Vec<FusedDocument>;
}

/// Configuration for the optional rerank stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    /// Whether reranking runs at all. Off by default; when off, the fused
    /// order passes through unchanged.
    pub enabled: bool,
    /// Boost added per keyword occurrence.
    pub keyword_weight: f32,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            keyword_weight: 0.05,
        }
    }
}

/// No-op reranker that preserves fused order.
pub struct NoopReranker;

impl Reranker for NoopReranker {
    fn rerank(&self, _query: &str, documents: Vec<FusedDocument>) -> Vec<FusedDocument> {
        documents
    }
}

/// Keyword-overlap reranker.
///
/// Tokenizes the query into lowercase keywords, counts their occurrences in
/// each document's text, and computes `new_score = similarity + count *
/// weight`, capped at 1.0. Results are re-sorted by the new score.
pub struct KeywordReranker {
    weight: f32,
}

impl KeywordReranker {
    /// Create a reranker with the given per-occurrence boost.
    pub fn new(weight: f32) -> Self {
        Self { weight }
    }

    fn clean(word: &str) -> &str {
        word.trim_matches(|c: char| !c.is_alphanumeric())
    }

    /// Count occurrences of query keywords in the text (word-level,
    /// case-insensitive).
    fn keyword_occurrences(query: &str, text: &str) -> usize {
        let lowered_query = query.to_lowercase();
        let keywords: HashSet<&str> = lowered_query
            .split_whitespace()
            .map(Self::clean)
            .filter(|w| !w.is_empty())
            .collect();

        if keywords.is_empty() {
            return 0;
        }

        let lowered_text = text.to_lowercase();
        lowered_text
            .split_whitespace()
            .map(Self::clean)
            .filter(|w| keywords.contains(w))
            .count()
    }
}

impl Reranker for KeywordReranker {
    fn rerank(&self, query: &str, mut documents: Vec<FusedDocument>) -> Vec<FusedDocument> {
        for fused in &mut documents {
            let count = Self::keyword_occurrences(query, &fused.document.text);
            let boost = count as f32 * self.weight;
            fused.reranked_score = Some((fused.document.score + boost).min(1.0));
        }

        documents.sort_by(|a, b| {
            b.reranked_score
                .partial_cmp(&a.reranked_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        documents
    }
}
