//! Generation Types
//!
//! Core types for generative-backend interactions: capability tiers,
//! per-request options, and the generation error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capability tier of the generative backend, supplied by the caller.
///
/// The tier selects between a cheaper/faster model and a slower/stronger
/// one; the mapping to a concrete model is the backend's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Fast,
    Balanced,
}

impl Default for ModelTier {
    fn default() -> Self {
        Self::Balanced
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelTier::Fast => write!(f, "fast"),
            ModelTier::Balanced => write!(f, "balanced"),
        }
    }
}

/// Per-request options for generation behavior.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationOptions {
    /// Capability tier for this request.
    #[serde(default)]
    pub tier: ModelTier,
    /// Optional temperature override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Optional cap on generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationOptions {
    /// Options for a given tier with backend defaults otherwise.
    pub fn tier(tier: ModelTier) -> Self {
        Self {
            tier,
            ..Default::default()
        }
    }
}

/// Errors surfaced by generation backends and the resilient client.
///
/// `Timeout` and `CircuitOpen` are produced by the resilient wrapper and are
/// deliberately distinct so callers can render "request took too long"
/// differently from "service temporarily unavailable".
#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Rate limit exceeded
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },

    /// Invalid request (bad parameters)
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Server-side error from the backend
    #[error("Server error: {message}")]
    ServerError {
        message: String,
        status: Option<u16>,
    },

    /// Network/connection error
    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// Response parsing error
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// The call exceeded its configured deadline
    #[error("Generation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The circuit breaker for this endpoint is open
    #[error("Circuit open for endpoint '{endpoint}'")]
    CircuitOpen { endpoint: String },

    /// Other error
    #[error("{message}")]
    Other { message: String },
}

/// Result type alias for generation errors
pub type GenerationResult<T> = Result<T, GenerationError>;

impl GenerationError {
    /// Whether a retry against the same endpoint could plausibly succeed.
    ///
    /// Authentication, request-shape, and parse errors are permanent for a
    /// given request; a circuit-open rejection is handled by the breaker's
    /// own cool-down, not by retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited { .. }
                | GenerationError::ServerError { .. }
                | GenerationError::NetworkError { .. }
                | GenerationError::Timeout { .. }
        )
    }

    /// Stable machine-readable code, used on stream `Error` events.
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::AuthenticationFailed { .. } => "auth_failed",
            GenerationError::RateLimited { .. } => "rate_limited",
            GenerationError::InvalidRequest { .. } => "invalid_request",
            GenerationError::ServerError { .. } => "server_error",
            GenerationError::NetworkError { .. } => "network_error",
            GenerationError::ParseError { .. } => "parse_error",
            GenerationError::Timeout { .. } => "timeout",
            GenerationError::CircuitOpen { .. } => "circuit_open",
            GenerationError::Other { .. } => "other",
        }
    }

    /// Create an `Other` error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other {
            message: msg.into(),
        }
    }
}
