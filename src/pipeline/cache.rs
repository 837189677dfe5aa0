//! Search Result Cache
//!
//! Memoizes vector-index responses keyed by a normalized, hashed
//! representation of the request, so paraphrases that differ only in
//! formatting hit the same entry (semantically different queries are not
//! deduplicated). Entries carry a TTL; any corpus mutation invalidates the
//! whole namespace through `invalidate_all`, since partial invalidation of
//! a similarity index is not generally computable.
//!
//! Bulk eviction is safe to run concurrently with in-flight reads: readers
//! observe either the old or the new cache state, never a torn entry.

use std::sync::Arc;
use std::time::Duration;

use mini_moka::sync::{Cache, ConcurrentCacheExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::pipeline::metrics::PipelineMetrics;
use crate::pipeline::search::{RetrievalError, VectorSearch};
use ragline_core::document::{RankedList, SearchRequest};

/// Configuration for the search result cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCacheConfig {
    /// Whether caching is enabled.
    pub enabled: bool,
    /// Maximum number of cached responses.
    pub max_entries: u64,
    /// Entry time-to-live, in seconds.
    pub ttl_secs: u64,
}

impl Default for SearchCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl_secs: 300,
        }
    }
}

/// Caching wrapper around a `VectorSearch` client.
pub struct SearchCache {
    inner: Arc<dyn VectorSearch>,
    cache: Option<Cache<[u8; 32], RankedList>>,
    metrics: Arc<PipelineMetrics>,
}

impl SearchCache {
    /// Wrap a search client with the given cache configuration.
    pub fn new(
        inner: Arc<dyn VectorSearch>,
        config: SearchCacheConfig,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let cache = if config.enabled {
            Some(
                Cache::builder()
                    .max_capacity(config.max_entries)
                    .time_to_live(Duration::from_secs(config.ttl_secs))
                    .build(),
            )
        } else {
            None
        };

        Self {
            inner,
            cache,
            metrics,
        }
    }

    /// Return the cached response for an equivalent request, or run the
    /// search and cache the result.
    pub async fn get_or_search(
        &self,
        request: &SearchRequest,
    ) -> Result<RankedList, RetrievalError> {
        let Some(cache) = &self.cache else {
            return self.inner.search(request).await;
        };

        let key = cache_key(request);
        if let Some(hit) = cache.get(&key) {
            self.metrics.record_cache_hit();
            return Ok(hit);
        }
        self.metrics.record_cache_miss();

        let results = self.inner.search(request).await?;
        cache.insert(key, results.clone());
        Ok(results)
    }

    /// Evict every cached response.
    ///
    /// The ingestion subsystem must call this after any successful write to
    /// the index.
    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
            cache.sync();
        }
    }

    /// Number of live cache entries (0 when caching is disabled).
    pub fn entry_count(&self) -> u64 {
        self.cache.as_ref().map_or(0, |cache| {
            cache.sync();
            cache.entry_count()
        })
    }
}

/// Normalize a query for cache keying: lowercase, strip punctuation,
/// collapse whitespace.
///
/// Best-effort by design: locale-specific casing and semantically
/// equivalent rewordings are out of scope for the key.
pub fn normalize_query(query: &str) -> String {
    let lowered = query.to_lowercase();
    let mapped: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cache key: SHA-256 over the normalized query, top_k, similarity floor,
/// and the filter signature when present.
fn cache_key(request: &SearchRequest) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(normalize_query(&request.query).as_bytes());
    hasher.update([0x1f]);
    hasher.update(request.top_k.to_le_bytes());
    hasher.update(request.similarity_floor.to_le_bytes());
    if let Some(filter) = &request.filter {
        hasher.update([0x1f]);
        hasher.update(filter.signature().as_bytes());
    }
    hasher.finalize().into()
}
