//! Ragline Core
//!
//! Foundational types for the Ragline answer-engine workspace. This crate
//! has zero dependencies on application-level code (pipeline stages, LLM
//! backends, caches).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `document` - Retrieval value types (`Document`, `SearchRequest`, `MetadataFilter`)
//! - `streaming` - Answer stream event types (`AnswerStreamEvent`)
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/async-trait/thiserror** - keeps build times minimal
//! 2. **Immutable value types** - pipeline stages annotate copies, never shared mutable state
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod document;
pub mod error;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Retrieval Value Types ──────────────────────────────────────────────
pub use document::{Document, Metadata, MetadataFilter, RankedList, SearchRequest};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::AnswerStreamEvent;
