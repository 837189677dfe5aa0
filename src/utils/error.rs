//! Error Handling
//!
//! Pipeline-level error taxonomy. Each variant names the layer that failed
//! so callers can decide retry-ability: expansion and retrieval failures
//! are recoverable upstream, contract violations indicate a bug, and
//! generation failures are always surfaced.

use ragline_llm::GenerationError;
use thiserror::Error;

/// Pipeline-wide error type
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Query expansion failed (generative paraphrasing call)
    #[error("Expansion error: {0}")]
    Expansion(String),

    /// Retrieval failed for every expanded query
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// A pure stage (fusion, assembly) violated its contract; indicates an
    /// upstream bug, never retried
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Generation failed after the resilient client gave up
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// Result type alias for pipeline errors
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Create an expansion error
    pub fn expansion(msg: impl Into<String>) -> Self {
        Self::Expansion(msg.into())
    }

    /// Create a retrieval error
    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval(msg.into())
    }

    /// Create a contract-violation error
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    /// Stable layer tag for logging and failure signals.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Expansion(_) => "expansion",
            PipelineError::Retrieval(_) => "retrieval",
            PipelineError::Contract(_) => "contract",
            PipelineError::Generation(_) => "generation",
        }
    }
}

/// Convert PipelineError to a string suitable for API responses
impl From<PipelineError> for String {
    fn from(err: PipelineError) -> String {
        err.to_string()
    }
}
