//! Single-Shot Pipeline Integration Tests
//!
//! Exercises the full expand -> retrieve -> fuse -> rerank -> assemble ->
//! generate flow with scripted collaborators.

use std::sync::Arc;

use ragline::pipeline::engine::DEFAULT_NO_CONTEXT_MESSAGE;
use ragline::pipeline::search::VectorSearch;
use ragline::{AnswerEngine, AnswerEngineConfig, EmptyContextPolicy, PipelineError};
use ragline_llm::{GenerationBackend, ResilienceRegistry};

use super::support::{doc, lists, FailingIndex, FixedIndex, ScriptedBackend};

fn engine(
    backend: Arc<ScriptedBackend>,
    index: Arc<dyn VectorSearch>,
    config: AnswerEngineConfig,
) -> AnswerEngine {
    AnswerEngine::new(
        backend as Arc<dyn GenerationBackend>,
        index,
        Arc::new(ResilienceRegistry::default()),
        "primary",
        config,
    )
    .expect("create engine")
}

fn happy_setup() -> (Arc<ScriptedBackend>, Arc<FixedIndex>) {
    let backend = Arc::new(ScriptedBackend::new(
        Some("how does rrf work\nexplain rank fusion"),
        "Rank fusion merges independently ranked lists.",
    ));
    let index = Arc::new(FixedIndex::new(lists(&[
        (
            "what is rank fusion",
            &[
                doc("A", "scores are not comparable across sources", 0.9),
                doc("B", "reciprocal rank fusion sums rank reciprocals", 0.8),
            ],
        ),
        (
            "how does rrf work",
            &[
                doc("B", "reciprocal rank fusion sums rank reciprocals", 0.95),
                doc("C", "the smoothing constant dampens top ranks", 0.7),
            ],
        ),
        ("explain rank fusion", &[]),
    ])));
    (backend, index)
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn full_pipeline_answers_with_fused_sources() {
    let (backend, index) = happy_setup();
    let engine = engine(
        Arc::clone(&backend),
        Arc::clone(&index) as Arc<dyn VectorSearch>,
        AnswerEngineConfig::default(),
    );

    let answer = engine.answer("what is rank fusion").await.unwrap();

    assert_eq!(answer.text, "Rank fusion merges independently ranked lists.");
    assert!(!answer.no_context);
    assert_eq!(answer.degraded_queries, 0);

    // B appears in two lists, so it fuses above A and C.
    let ids: Vec<&str> = answer.sources.iter().map(|s| s.document.id.as_str()).collect();
    assert_eq!(ids, vec!["B", "A", "C"]);

    assert_eq!(backend.expansion_calls(), 1);
    assert_eq!(backend.generation_calls(), 1);
    assert_eq!(index.calls(), 3, "one retrieval per expanded query");
}

#[tokio::test]
async fn metrics_record_stage_activity() {
    let (backend, index) = happy_setup();
    let engine = engine(
        backend,
        index as Arc<dyn VectorSearch>,
        AnswerEngineConfig::default(),
    );

    engine.answer("what is rank fusion").await.unwrap();

    let snapshot = engine.metrics().snapshot();
    assert_eq!(snapshot.cache_misses, 3);
    assert_eq!(snapshot.cache_hits, 0);
    assert_eq!(snapshot.retrieval_calls, 1);
    assert_eq!(snapshot.generation_calls, 1);
}

// ============================================================================
// Scenario: every retrieval fails
// ============================================================================

#[tokio::test]
async fn all_retrievals_failing_is_a_retrieval_error_and_skips_generation() {
    let backend = Arc::new(ScriptedBackend::new(
        Some("variant one\nvariant two"),
        "never produced",
    ));
    let index = Arc::new(FailingIndex::new());
    let engine = engine(
        Arc::clone(&backend),
        Arc::clone(&index) as Arc<dyn VectorSearch>,
        AnswerEngineConfig::default(),
    );

    let err = engine.answer("what is rank fusion").await.unwrap_err();

    assert!(matches!(err, PipelineError::Retrieval(_)));
    assert_eq!(err.kind(), "retrieval");
    assert_eq!(index.calls(), 3);
    assert_eq!(backend.generation_calls(), 0, "generation must not be invoked");
}

// ============================================================================
// Scenario: zero documents retrieved
// ============================================================================

#[tokio::test]
async fn empty_fusion_short_circuits_with_fixed_message() {
    let backend = Arc::new(ScriptedBackend::new(Some("variant one"), "never produced"));
    let index = Arc::new(FixedIndex::empty());
    let engine = engine(
        Arc::clone(&backend),
        index as Arc<dyn VectorSearch>,
        AnswerEngineConfig::default(),
    );

    let answer = engine.answer("anything at all").await.unwrap();

    assert!(answer.no_context);
    assert_eq!(answer.text, DEFAULT_NO_CONTEXT_MESSAGE);
    assert!(answer.sources.is_empty());
    assert_eq!(backend.generation_calls(), 0, "generation must not be invoked");
}

#[tokio::test]
async fn empty_fusion_message_is_configurable() {
    let backend = Arc::new(ScriptedBackend::new(Some("variant one"), "never produced"));
    let engine = engine(
        backend,
        Arc::new(FixedIndex::empty()) as Arc<dyn VectorSearch>,
        AnswerEngineConfig {
            empty_context: EmptyContextPolicy::FixedMessage {
                message: "The knowledge base has nothing on this.".to_string(),
            },
            ..Default::default()
        },
    );

    let answer = engine.answer("anything").await.unwrap();
    assert_eq!(answer.text, "The knowledge base has nothing on this.");
}

#[tokio::test]
async fn empty_fusion_can_generate_without_context_when_configured() {
    let backend = Arc::new(ScriptedBackend::new(
        Some("variant one"),
        "I could not find anything relevant.",
    ));
    let engine = engine(
        Arc::clone(&backend),
        Arc::new(FixedIndex::empty()) as Arc<dyn VectorSearch>,
        AnswerEngineConfig {
            empty_context: EmptyContextPolicy::GenerateWithoutContext,
            ..Default::default()
        },
    );

    let answer = engine.answer("anything").await.unwrap();

    assert!(answer.no_context);
    assert_eq!(answer.text, "I could not find anything relevant.");
    assert_eq!(backend.generation_calls(), 1);
}

// ============================================================================
// Partial degradation
// ============================================================================

#[tokio::test]
async fn failed_expanded_queries_degrade_instead_of_failing() {
    let backend = Arc::new(ScriptedBackend::new(
        Some("how does rrf work"),
        "An answer from partial retrieval.",
    ));
    let index = Arc::new(
        FixedIndex::new(lists(&[(
            "what is rank fusion",
            &[doc("A", "rank fusion background", 0.9)],
        )]))
        .with_failing_queries(&["how does rrf work"]),
    );
    let engine = engine(
        backend,
        index as Arc<dyn VectorSearch>,
        AnswerEngineConfig::default(),
    );

    let answer = engine.answer("what is rank fusion").await.unwrap();

    assert_eq!(answer.degraded_queries, 1);
    assert_eq!(answer.text, "An answer from partial retrieval.");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].document.id, "A");
}

// ============================================================================
// Expansion failure policy
// ============================================================================

#[tokio::test]
async fn expansion_failure_falls_back_to_the_original_query() {
    let backend = Arc::new(ScriptedBackend::new(None, "Answer without expansion."));
    let index = Arc::new(FixedIndex::new(lists(&[(
        "what is rank fusion",
        &[doc("A", "rank fusion background", 0.9)],
    )])));
    let engine = engine(
        Arc::clone(&backend),
        Arc::clone(&index) as Arc<dyn VectorSearch>,
        AnswerEngineConfig::default(),
    );

    let answer = engine.answer("what is rank fusion").await.unwrap();

    assert_eq!(answer.text, "Answer without expansion.");
    assert_eq!(index.calls(), 1, "only the original query is retrieved");
}

#[tokio::test]
async fn expansion_failure_can_fail_the_request_when_configured() {
    let backend = Arc::new(ScriptedBackend::new(None, "never produced"));
    let index = Arc::new(FixedIndex::empty());
    let engine = engine(
        backend,
        Arc::clone(&index) as Arc<dyn VectorSearch>,
        AnswerEngineConfig {
            fail_on_expansion_error: true,
            ..Default::default()
        },
    );

    let err = engine.answer("q").await.unwrap_err();
    assert!(matches!(err, PipelineError::Expansion(_)));
    assert_eq!(index.calls(), 0, "retrieval never starts");
}

// ============================================================================
// Rerank stage
// ============================================================================

fn rerank_setup() -> (Arc<ScriptedBackend>, Arc<FixedIndex>) {
    let backend = Arc::new(ScriptedBackend::new(Some(""), "Answer."));
    let index = Arc::new(FixedIndex::new(lists(&[(
        "rust ownership",
        &[
            doc("weather", "sunny weather expected today", 0.9),
            doc("rust", "rust ownership rules in rust", 0.5),
        ],
    )])));
    (backend, index)
}

#[tokio::test]
async fn rerank_disabled_keeps_fused_order() {
    let (backend, index) = rerank_setup();
    let engine = engine(
        backend,
        index as Arc<dyn VectorSearch>,
        AnswerEngineConfig::default(),
    );

    let answer = engine.answer("rust ownership").await.unwrap();
    assert_eq!(answer.sources[0].document.id, "weather");
    assert!(answer.sources[0].reranked_score.is_none());
}

#[tokio::test]
async fn rerank_enabled_boosts_keyword_overlap() {
    let (backend, index) = rerank_setup();
    let mut config = AnswerEngineConfig::default();
    config.rerank.enabled = true;
    config.rerank.keyword_weight = 0.3;
    let engine = engine(backend, index as Arc<dyn VectorSearch>, config);

    let answer = engine.answer("rust ownership").await.unwrap();

    // "rust" matches twice and "ownership" once: 0.5 + 3 * 0.3, capped at 1.0.
    assert_eq!(answer.sources[0].document.id, "rust");
    assert!((answer.sources[0].reranked_score.unwrap() - 1.0).abs() < 1e-6);
}

// ============================================================================
// Context budget
// ============================================================================

#[tokio::test]
async fn sources_are_a_budgeted_prefix_of_the_fused_order() {
    let backend = Arc::new(ScriptedBackend::new(Some(""), "Answer."));
    let index = Arc::new(FixedIndex::new(lists(&[(
        "budget test",
        &[
            doc("fits", "alpha beta", 0.9),
            doc(
                "too-big",
                "this is a much longer document that certainly exceeds the tiny \
                 token budget configured for the context assembler in this test",
                0.8,
            ),
            doc("small-but-late", "tiny", 0.7),
        ],
    )])));
    let mut config = AnswerEngineConfig::default();
    config.context.token_budget = 10;
    let engine = engine(backend, index as Arc<dyn VectorSearch>, config);

    let answer = engine.answer("budget test").await.unwrap();

    // The oversized document stops iteration; the small document after it
    // stays excluded even though it would fit.
    let ids: Vec<&str> = answer.sources.iter().map(|s| s.document.id.as_str()).collect();
    assert_eq!(ids, vec!["fits"]);
}
