//! Ragline LLM
//!
//! Generation-backend abstraction and the resilient client that wraps it.
//!
//! The crate deliberately contains no wire-format code: a concrete backend
//! (HTTP API, local inference server, ...) implements `GenerationBackend`
//! at the application's composition root. What lives here is everything
//! between the pipeline and that backend:
//!
//! - `backend` - the `GenerationBackend` trait (chat, chat_stream, health_check)
//! - `types` - capability tiers, request options, and the error taxonomy
//! - `retry` - bounded attempts with exponential backoff
//! - `breaker` - CLOSED/OPEN/HALF_OPEN circuit breaker
//! - `resilient` - the composed client plus the per-endpoint policy registry

pub mod backend;
pub mod breaker;
pub mod resilient;
pub mod retry;
pub mod types;

// Re-export main types
pub use backend::GenerationBackend;
pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use resilient::{
    EndpointState, ResiliencePolicies, ResilienceRegistry, ResilientGenerationClient,
    StreamOutcome,
};
pub use retry::RetryPolicy;
pub use types::{GenerationError, GenerationOptions, GenerationResult, ModelTier};
