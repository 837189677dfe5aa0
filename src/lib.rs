//! Ragline - Retrieval-Augmented Answer Engine
//!
//! Answers a natural-language question by retrieving relevant snippets from
//! a corpus and feeding a curated, token-budgeted context to a generative
//! model. The crate owns the pipeline itself:
//! - Query expansion and concurrent per-variant retrieval
//! - An invalidation-aware search result cache
//! - Reciprocal Rank Fusion and optional keyword reranking
//! - Budget-aware context assembly and prompt rendering
//! - Resilient generation (retry, circuit breaker, time limiter) in
//!   single-shot and streaming modes
//!
//! The vector index and the generative backend are external collaborators,
//! consumed through the `VectorSearch` and `GenerationBackend` traits.

pub mod pipeline;
pub mod utils;

// Re-export the engine surface
pub use pipeline::engine::{
    Answer, AnswerEngine, AnswerEngineConfig, CompletionSink, EmptyContextPolicy,
};
pub use pipeline::search::{RetrievalError, VectorSearch};
pub use utils::error::{PipelineError, PipelineResult};
