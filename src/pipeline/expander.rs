//! Query Expander
//!
//! Produces paraphrased variants of the question through one generative
//! call, so retrieval can fan out over multiple phrasings. The original
//! query always comes first in the result. Expansion is never retried
//! here; whether to fall back to the original-only list on failure is the
//! caller's policy.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ragline_llm::{GenerationBackend, GenerationOptions, GenerationResult, ModelTier};

/// Configuration for query expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryExpanderConfig {
    /// Number of paraphrased variants to request. 0 disables the
    /// generative call entirely.
    pub variants: usize,
    /// Capability tier for the expansion call; paraphrasing does not need
    /// the strong model.
    pub tier: ModelTier,
}

impl Default for QueryExpanderConfig {
    fn default() -> Self {
        Self {
            variants: 3,
            tier: ModelTier::Fast,
        }
    }
}

/// Generative query expander.
pub struct QueryExpander {
    backend: Arc<dyn GenerationBackend>,
    config: QueryExpanderConfig,
}

impl QueryExpander {
    /// Create an expander over the given backend.
    pub fn new(backend: Arc<dyn GenerationBackend>, config: QueryExpanderConfig) -> Self {
        Self { backend, config }
    }

    fn build_expansion_prompt(&self, query: &str) -> String {
        format!(
            "Produce {} alternative phrasings of the question below, in the same language. \
             One per line. No numbering, no commentary.\n\nQuestion: {}",
            self.config.variants, query
        )
    }

    /// Expand a query into `[original, variant, ...]`.
    ///
    /// If the model returns fewer than the requested variants (or blank
    /// output), the result may contain only the original query. Errors from
    /// the generative call are surfaced unchanged.
    pub async fn expand(&self, query: &str) -> GenerationResult<Vec<String>> {
        if self.config.variants == 0 {
            return Ok(vec![query.to_string()]);
        }

        let prompt = self.build_expansion_prompt(query);
        let options = GenerationOptions::tier(self.config.tier);
        let response = self.backend.chat(&prompt, &options).await?;

        let mut queries = Vec::with_capacity(self.config.variants + 1);
        queries.push(query.to_string());
        for line in response.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            queries.push(trimmed.to_string());
            if queries.len() == self.config.variants + 1 {
                break;
            }
        }

        Ok(queries)
    }
}
