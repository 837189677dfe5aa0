//! Pipeline Metrics
//!
//! Atomic counters for the cache hit/miss ratio and cumulative stage
//! timings. Measurements are also emitted through `tracing`; exporting them
//! under concrete metric names is the embedding application's concern.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Shared metrics for one engine instance.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    retrieval_calls: AtomicU64,
    retrieval_ms_total: AtomicU64,
    generation_calls: AtomicU64,
    generation_ms_total: AtomicU64,
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub retrieval_calls: u64,
    pub retrieval_ms_total: u64,
    pub generation_calls: u64,
    pub generation_ms_total: u64,
}

impl PipelineMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a search-cache hit.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a search-cache miss.
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the wall-clock time of one retrieval fan-out.
    pub fn record_retrieval(&self, elapsed: Duration) {
        let ms = elapsed.as_millis() as u64;
        self.retrieval_calls.fetch_add(1, Ordering::Relaxed);
        self.retrieval_ms_total.fetch_add(ms, Ordering::Relaxed);
        tracing::debug!(elapsed_ms = ms, "retrieval completed");
    }

    /// Record the wall-clock time of one generation call.
    pub fn record_generation(&self, elapsed: Duration) {
        let ms = elapsed.as_millis() as u64;
        self.generation_calls.fetch_add(1, Ordering::Relaxed);
        self.generation_ms_total.fetch_add(ms, Ordering::Relaxed);
        tracing::debug!(elapsed_ms = ms, "generation completed");
    }

    /// Search-cache hits so far.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Search-cache misses so far.
    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Copy all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits(),
            cache_misses: self.cache_misses(),
            retrieval_calls: self.retrieval_calls.load(Ordering::Relaxed),
            retrieval_ms_total: self.retrieval_ms_total.load(Ordering::Relaxed),
            generation_calls: self.generation_calls.load(Ordering::Relaxed),
            generation_ms_total: self.generation_ms_total.load(Ordering::Relaxed),
        }
    }
}
