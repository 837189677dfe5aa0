//! Retry Policy
//!
//! Bounded-attempt retry with exponential backoff. The policy is a plain
//! value; the resilient client owns the attempt loop and consults the
//! policy for delays.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for transient generation failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum total attempts (first call included). 1 disables retry.
    pub max_attempts: u32,
    /// Delay before the first re-attempt, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Multiplier applied per additional attempt.
    pub backoff_multiplier: f64,
    /// Upper bound on any single backoff delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            backoff_multiplier: 2.0,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay after the given 1-based attempt number.
    ///
    /// Attempt 1 -> initial delay, attempt 2 -> initial * multiplier, and
    /// so on, capped at `max_backoff_ms`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let raw = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(raw.min(self.max_backoff_ms as f64) as u64)
    }
}
