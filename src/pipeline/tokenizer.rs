//! Token Counting
//!
//! Counts model-tokenizer units for arbitrary text using the cl100k_base
//! encoding. Counting is pure and deterministic for a fixed encoding, so
//! results are memoized by a SHA-256 content hash; popular documents recur
//! across many context-assembly calls and hit the cache.

use mini_moka::sync::Cache;
use sha2::{Digest, Sha256};
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Default capacity of the memoization cache.
const DEFAULT_CACHE_CAPACITY: u64 = 50_000;

/// Seam for token counting so budget logic can be tested with a
/// deterministic counter.
pub trait CountTokens: Send + Sync {
    /// Number of tokens in `text`; empty input is 0. Must not fail for any
    /// Unicode input.
    fn count_tokens(&self, text: &str) -> usize;
}

/// cl100k_base token counter with content-hash memoization.
pub struct TokenCounter {
    bpe: CoreBPE,
    cache: Cache<[u8; 32], usize>,
}

impl TokenCounter {
    /// Create a counter with the default cache capacity.
    pub fn new() -> Self {
        Self {
            // The vocabulary is embedded in the binary; loading it can only
            // fail if the build itself is broken.
            bpe: cl100k_base().expect("embedded cl100k_base vocabulary"),
            cache: Cache::builder()
                .max_capacity(DEFAULT_CACHE_CAPACITY)
                .build(),
        }
    }

    /// Count tokens without consulting the cache.
    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_ordinary(text).len()
    }

    /// Count tokens, memoized by exact text equality.
    pub fn count_cached(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let key: [u8; 32] = Sha256::digest(text.as_bytes()).into();
        if let Some(count) = self.cache.get(&key) {
            return count;
        }
        let count = self.count(text);
        self.cache.insert(key, count);
        count
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl CountTokens for TokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        self.count_cached(text)
    }
}
