//! Integration Tests Module
//!
//! End-to-end tests for the Ragline answer engine. Tests compose the real
//! pipeline (expansion, cached retrieval, fusion, rerank, assembly,
//! resilient generation) over scripted vector-index and generation-backend
//! mocks with call counters.

// Shared mock backends and sinks
mod support;

// Single-shot pipeline tests (short-circuit, degradation, rerank)
mod engine_test;


// Resilience tests (timeout vs circuit-open, retry exhaustion)
mod resilience_test;
