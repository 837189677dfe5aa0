//! Resilience Integration Tests
//!
//! Timeout, retry exhaustion, and circuit breaking through the engine, with
//! the error sub-kinds a caller needs to tell apart.

use std::sync::Arc;
use std::time::Duration;

use ragline::pipeline::search::VectorSearch;
use ragline::{AnswerEngine, AnswerEngineConfig, PipelineError};
use ragline_llm::{
    CircuitBreakerConfig, GenerationBackend, GenerationError, ResiliencePolicies,
    ResilienceRegistry, RetryPolicy,
};

use super::support::{doc, lists, FixedIndex, ScriptedBackend};

fn policies(max_attempts: u32, failure_threshold: u32, request_timeout_ms: u64) -> ResiliencePolicies {
    ResiliencePolicies {
        retry: RetryPolicy {
            max_attempts,
            initial_backoff_ms: 1,
            backoff_multiplier: 1.0,
            max_backoff_ms: 5,
        },
        breaker: CircuitBreakerConfig {
            failure_threshold,
            success_threshold: 1,
            cool_down_ms: 60_000,
        },
        request_timeout_ms,
        first_chunk_timeout_ms: request_timeout_ms,
    }
}

fn no_expansion_config() -> AnswerEngineConfig {
    let mut config = AnswerEngineConfig::default();
    config.expansion.variants = 0;
    config
}

fn engine_with(
    backend: Arc<ScriptedBackend>,
    policies: ResiliencePolicies,
) -> (AnswerEngine, Arc<ScriptedBackend>) {
    let index = Arc::new(FixedIndex::new(lists(&[(
        "question",
        &[doc("D", "a relevant document", 0.9)],
    )])));
    let engine = AnswerEngine::new(
        Arc::clone(&backend) as Arc<dyn GenerationBackend>,
        index as Arc<dyn VectorSearch>,
        Arc::new(ResilienceRegistry::new(policies)),
        "primary",
        no_expansion_config(),
    )
    .expect("create engine");
    (engine, backend)
}

#[tokio::test]
async fn slow_generation_surfaces_a_timeout_error() {
    let backend = Arc::new(
        ScriptedBackend::new(None, "too late").with_generation_delay(Duration::from_millis(200)),
    );
    let (engine, _backend) = engine_with(backend, policies(1, 5, 50));

    let err = engine.answer("question").await.unwrap_err();
    match err {
        PipelineError::Generation(GenerationError::Timeout { .. }) => {}
        other => panic!("expected a timeout error, got: {}", other),
    }
}

#[tokio::test]
async fn transient_failures_are_retried_to_success() {
    let backend =
        Arc::new(ScriptedBackend::new(None, "recovered answer").with_generation_failures(2));
    let (engine, backend) = engine_with(backend, policies(3, 10, 1_000));

    let answer = engine.answer("question").await.unwrap();
    assert_eq!(answer.text, "recovered answer");
    assert_eq!(backend.generation_calls(), 3);
}

#[tokio::test]
async fn exhausted_retries_surface_the_backend_error() {
    let backend = Arc::new(
        ScriptedBackend::new(None, "never").with_generation_failures(u32::MAX),
    );
    let (engine, backend) = engine_with(backend, policies(2, 10, 1_000));

    let err = engine.answer("question").await.unwrap_err();
    match err {
        PipelineError::Generation(GenerationError::ServerError { .. }) => {}
        other => panic!("expected a server error, got: {}", other),
    }
    assert_eq!(backend.generation_calls(), 2);
}

#[tokio::test]
async fn consecutive_failures_open_the_circuit_and_fail_fast() {
    let backend = Arc::new(
        ScriptedBackend::new(None, "never").with_generation_failures(u32::MAX),
    );
    // 1 attempt per request, breaker trips after 5 consecutive failures.
    let (engine, backend) = engine_with(backend, policies(1, 5, 1_000));

    for _ in 0..5 {
        let err = engine.answer("question").await.unwrap_err();
        match err {
            PipelineError::Generation(GenerationError::ServerError { .. }) => {}
            other => panic!("expected a server error, got: {}", other),
        }
    }
    assert_eq!(backend.generation_calls(), 5);

    // The sixth request is rejected without reaching the backend, with an
    // error a caller can distinguish from a timeout.
    let err = engine.answer("question").await.unwrap_err();
    match &err {
        PipelineError::Generation(inner @ GenerationError::CircuitOpen { .. }) => {
            assert_eq!(inner.code(), "circuit_open");
            assert_ne!(
                inner.code(),
                GenerationError::Timeout { elapsed_ms: 0 }.code()
            );
        }
        other => panic!("expected a circuit-open error, got: {}", other),
    }
    assert_eq!(backend.generation_calls(), 5, "open circuit skips the backend");
}
