//! Answer Stream Event Types
//!
//! Provider-agnostic event types for streaming answer generation. These
//! types are shared across the LLM crate (backend implementations and the
//! resilient client) and the pipeline crate (engine, completion sinks).

use serde::{Deserialize, Serialize};

/// Unified streaming event emitted while an answer is being generated.
/// This provides a consistent interface for consumers regardless of the
/// generative backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerStreamEvent {
    /// Text content delta from the model
    TextDelta { content: String },

    /// Error during streaming; always terminal for the stream
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Stream complete
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
    },
}

impl AnswerStreamEvent {
    /// Convenience constructor for a text delta.
    pub fn delta(content: impl Into<String>) -> Self {
        Self::TextDelta {
            content: content.into(),
        }
    }

    /// Returns true for the terminal events (`Complete` and `Error`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}
