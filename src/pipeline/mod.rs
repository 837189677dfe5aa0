//! Pipeline Stages
//!
//! The retrieval-augmented answering pipeline, leaf stages first:
//! tokenizer, query expander, vector search client + result cache, RRF
//! fusion, optional reranker, context assembler, prompt builder, and the
//! engine that orchestrates them over the resilient generation client.

pub mod assembler;
pub mod cache;
pub mod engine;
pub mod expander;
pub mod fusion;
pub mod metrics;
pub mod prompt;
pub mod reranker;
pub mod search;
pub mod tokenizer;

pub use assembler::{AssembledContext, ContextAssembler, ContextAssemblerConfig};
pub use cache::{normalize_query, SearchCache, SearchCacheConfig};
pub use engine::{
    Answer, AnswerEngine, AnswerEngineConfig, CompletionSink, EmptyContextPolicy,
    DEFAULT_NO_CONTEXT_MESSAGE,
};
pub use expander::{QueryExpander, QueryExpanderConfig};
pub use fusion::{fuse, FusedDocument, SourceContribution, DEFAULT_RRF_K};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use prompt::{PromptBuilder, DEFAULT_TEMPLATE};
pub use reranker::{KeywordReranker, NoopReranker, RerankConfig, Reranker};
pub use search::{RetrievalConfig, RetrievalError, VectorSearch};
pub use tokenizer::{CountTokens, TokenCounter};
