//! Answer Engine
//!
//! Orchestrates the full retrieval-augmented answering flow:
//! expand -> retrieve per expanded query (parallel) -> fuse -> rerank
//! (optional) -> assemble -> build prompt -> generate.
//!
//! Retrieval fans out concurrently over the expanded queries and joins
//! before fusion; fusion needs the complete set of ranked lists. If fusion
//! produces nothing, the engine short-circuits with a configured message
//! instead of sending an empty-context prompt to the model.
//!
//! Failures before generation surface as expansion/retrieval errors;
//! failures at generation surface as generation errors. Callers distinguish
//! the two to decide retry-ability.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::pipeline::assembler::{ContextAssembler, ContextAssemblerConfig};
use crate::pipeline::cache::{SearchCache, SearchCacheConfig};
use crate::pipeline::expander::{QueryExpander, QueryExpanderConfig};
use crate::pipeline::fusion::{fuse, FusedDocument, DEFAULT_RRF_K};
use crate::pipeline::metrics::PipelineMetrics;
use crate::pipeline::prompt::PromptBuilder;
use crate::pipeline::reranker::{KeywordReranker, NoopReranker, Reranker, RerankConfig};
use crate::pipeline::search::{RetrievalConfig, VectorSearch};
use crate::pipeline::tokenizer::TokenCounter;
use crate::utils::error::{PipelineError, PipelineResult};
use ragline_core::streaming::AnswerStreamEvent;
use ragline_llm::{
    GenerationBackend, GenerationOptions, ModelTier, ResilienceRegistry,
    ResilientGenerationClient,
};

/// Default short-circuit answer when retrieval finds nothing.
pub const DEFAULT_NO_CONTEXT_MESSAGE: &str =
    "No relevant information was found for this question.";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when fusion yields zero documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum EmptyContextPolicy {
    /// Return this fixed message without invoking the generation client.
    FixedMessage { message: String },
    /// Send the question to the model with an empty context block and let
    /// it answer (or decline) on its own.
    GenerateWithoutContext,
}

impl Default for EmptyContextPolicy {
    fn default() -> Self {
        Self::FixedMessage {
            message: DEFAULT_NO_CONTEXT_MESSAGE.to_string(),
        }
    }
}

/// Configuration for the answer engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerEngineConfig {
    /// Query expansion settings.
    #[serde(default)]
    pub expansion: QueryExpanderConfig,
    /// Per-query retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Search result cache settings.
    #[serde(default)]
    pub cache: SearchCacheConfig,
    /// RRF smoothing constant.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,
    /// Optional rerank stage settings.
    #[serde(default)]
    pub rerank: RerankConfig,
    /// Context assembly settings.
    #[serde(default)]
    pub context: ContextAssemblerConfig,
    /// Capability tier for answer generation.
    #[serde(default)]
    pub generation_tier: ModelTier,
    /// Fail the request when expansion fails, instead of falling back to
    /// the original-only query list.
    #[serde(default)]
    pub fail_on_expansion_error: bool,
    /// Behavior when fusion yields zero documents.
    #[serde(default)]
    pub empty_context: EmptyContextPolicy,
}

fn default_rrf_k() -> f64 {
    DEFAULT_RRF_K
}

impl Default for AnswerEngineConfig {
    fn default() -> Self {
        Self {
            expansion: QueryExpanderConfig::default(),
            retrieval: RetrievalConfig::default(),
            cache: SearchCacheConfig::default(),
            rrf_k: DEFAULT_RRF_K,
            rerank: RerankConfig::default(),
            context: ContextAssemblerConfig::default(),
            generation_tier: ModelTier::default(),
            fail_on_expansion_error: false,
            empty_context: EmptyContextPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// The engine's answer plus retrieval diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text (or the configured no-context message).
    pub text: String,
    /// True when the engine short-circuited on empty retrieval.
    pub no_context: bool,
    /// Expanded queries whose retrieval failed.
    pub degraded_queries: usize,
    /// Documents included in the context, best first.
    pub sources: Vec<FusedDocument>,
}

struct RetrievalOutcome {
    fused: Vec<FusedDocument>,
    degraded_queries: usize,
}

/// Side-effect hook for streaming runs, called exactly once with the final
/// text (`completed = true`) or the partial text accumulated before the
/// consumer disconnected (`completed = false`).
#[async_trait]
pub trait CompletionSink: Send + Sync {
    async fn persist(&self, text: &str, completed: bool);
}

// ---------------------------------------------------------------------------
// AnswerEngine
// ---------------------------------------------------------------------------

/// End-to-end retrieval-augmented answer engine.
pub struct AnswerEngine {
    expander: QueryExpander,
    search: SearchCache,
    reranker: Box<dyn Reranker>,
    assembler: ContextAssembler,
    prompt_builder: PromptBuilder,
    generation: ResilientGenerationClient,
    metrics: Arc<PipelineMetrics>,
    config: AnswerEngineConfig,
}

impl AnswerEngine {
    /// Compose an engine from its external collaborators.
    ///
    /// `endpoint` names the generative backend for resilience policy
    /// sharing; `registry` is the injected per-endpoint policy registry
    /// owned by the composition root.
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        index: Arc<dyn VectorSearch>,
        registry: Arc<ResilienceRegistry>,
        endpoint: impl Into<String>,
        config: AnswerEngineConfig,
    ) -> PipelineResult<Self> {
        config
            .retrieval
            .request("probe")
            .validate()
            .map_err(|err| PipelineError::contract(format!("invalid retrieval config: {}", err)))?;

        let metrics = Arc::new(PipelineMetrics::new());
        let expander = QueryExpander::new(Arc::clone(&backend), config.expansion.clone());
        let search = SearchCache::new(index, config.cache.clone(), Arc::clone(&metrics));
        let reranker: Box<dyn Reranker> = if config.rerank.enabled {
            Box::new(KeywordReranker::new(config.rerank.keyword_weight))
        } else {
            Box::new(NoopReranker)
        };
        let assembler = ContextAssembler::new(
            Arc::new(TokenCounter::new()),
            config.context.clone(),
        );
        let generation = ResilientGenerationClient::new(backend, endpoint, registry);

        Ok(Self {
            expander,
            search,
            reranker,
            assembler,
            prompt_builder: PromptBuilder::default(),
            generation,
            metrics,
            config,
        })
    }

    /// Builder-style override for the prompt template.
    pub fn with_prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }

    /// Shared metrics for this engine.
    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Check the generative backend's health through the resilient client.
    pub async fn health_check(&self) -> PipelineResult<()> {
        Ok(self.generation.health_check().await?)
    }

    /// Invalidation hook for the ingestion subsystem: evicts every cached
    /// search result after a corpus mutation.
    pub fn evict_cached_search_results(&self) {
        self.search.invalidate_all();
    }

    /// Answer a question in one shot.
    pub async fn answer(&self, question: &str) -> PipelineResult<Answer> {
        let retrieval = self.retrieve(question).await?;

        if retrieval.fused.is_empty() {
            if let EmptyContextPolicy::FixedMessage { message } = &self.config.empty_context {
                return Ok(Answer {
                    text: message.clone(),
                    no_context: true,
                    degraded_queries: retrieval.degraded_queries,
                    sources: Vec::new(),
                });
            }
        }

        let (prompt, sources) = self.build_prompt(question, &retrieval.fused);

        let started = Instant::now();
        let text = self
            .generation
            .generate(&prompt, &GenerationOptions::tier(self.config.generation_tier))
            .await?;
        self.metrics.record_generation(started.elapsed());

        Ok(Answer {
            text,
            no_context: retrieval.fused.is_empty(),
            degraded_queries: retrieval.degraded_queries,
            sources,
        })
    }

    /// Answer a question as a stream of events sent to `tx`.
    ///
    /// The completion sink runs on every outcome that produced text: normal
    /// completion and consumer disconnection (with the partial text). The
    /// returned `Answer` carries whatever text was produced.
    pub async fn answer_stream(
        &self,
        question: &str,
        tx: mpsc::Sender<AnswerStreamEvent>,
        sink: Option<Arc<dyn CompletionSink>>,
    ) -> PipelineResult<Answer> {
        let retrieval = self.retrieve(question).await?;

        if retrieval.fused.is_empty() {
            if let EmptyContextPolicy::FixedMessage { message } = &self.config.empty_context {
                let _ = tx.send(AnswerStreamEvent::delta(message.clone())).await;
                let _ = tx
                    .send(AnswerStreamEvent::Complete {
                        stop_reason: Some("no_context".to_string()),
                    })
                    .await;
                if let Some(sink) = &sink {
                    sink.persist(message, true).await;
                }
                return Ok(Answer {
                    text: message.clone(),
                    no_context: true,
                    degraded_queries: retrieval.degraded_queries,
                    sources: Vec::new(),
                });
            }
        }

        let (prompt, sources) = self.build_prompt(question, &retrieval.fused);

        let started = Instant::now();
        let result = self
            .generation
            .generate_stream(
                &prompt,
                &GenerationOptions::tier(self.config.generation_tier),
                &tx,
            )
            .await;
        self.metrics.record_generation(started.elapsed());

        let outcome = result?;
        if let Some(sink) = &sink {
            sink.persist(&outcome.text, outcome.completed).await;
        }

        Ok(Answer {
            text: outcome.text,
            no_context: retrieval.fused.is_empty(),
            degraded_queries: retrieval.degraded_queries,
            sources,
        })
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    /// Expand the question and retrieve ranked lists for every variant
    /// concurrently, then fuse and (optionally) rerank.
    async fn retrieve(&self, question: &str) -> PipelineResult<RetrievalOutcome> {
        let queries = match self.expander.expand(question).await {
            Ok(queries) => queries,
            Err(err) => {
                if self.config.fail_on_expansion_error {
                    return Err(PipelineError::expansion(err.to_string()));
                }
                tracing::warn!(
                    error = %err,
                    "query expansion failed, falling back to the original query"
                );
                vec![question.to_string()]
            }
        };

        let started = Instant::now();
        let searches = queries.iter().map(|query| {
            let request = self.config.retrieval.request(query);
            async move { self.search.get_or_search(&request).await }
        });
        let results = join_all(searches).await;
        self.metrics.record_retrieval(started.elapsed());

        let mut lists = Vec::with_capacity(queries.len());
        let mut degraded_queries = 0;
        for (query, result) in queries.iter().zip(results) {
            match result {
                Ok(mut list) => {
                    for doc in &mut list {
                        if doc.source_query.is_none() {
                            doc.source_query = Some(query.clone());
                        }
                    }
                    lists.push(list);
                }
                Err(err) => {
                    tracing::warn!(query = %query, error = %err, "retrieval failed for expanded query");
                    degraded_queries += 1;
                }
            }
        }

        if lists.is_empty() && degraded_queries > 0 {
            return Err(PipelineError::retrieval(format!(
                "all {} retrieval requests failed",
                degraded_queries
            )));
        }

        let fused = fuse(&lists, self.config.rrf_k);
        let fused = self.reranker.rerank(question, fused);

        Ok(RetrievalOutcome {
            fused,
            degraded_queries,
        })
    }

    /// Assemble the budgeted context and render the prompt; returns the
    /// prompt plus the documents that made it into the context.
    fn build_prompt(
        &self,
        question: &str,
        fused: &[FusedDocument],
    ) -> (String, Vec<FusedDocument>) {
        let assembled = self.assembler.assemble(fused);
        let sources = fused[..assembled.included].to_vec();
        let prompt = self.prompt_builder.build(&assembled.text, question);
        (prompt, sources)
    }
}
