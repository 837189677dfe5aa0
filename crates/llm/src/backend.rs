//! Generation Backend Trait
//!
//! Defines the common interface for all generative backends. The wire
//! format of a concrete backend (HTTP, local inference, ...) is not this
//! crate's concern; implementations live with the application's
//! composition root.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::{GenerationOptions, GenerationResult};
use ragline_core::streaming::AnswerStreamEvent;

/// Trait that all generative backends must implement.
///
/// Provides a unified interface for:
/// - Single answer completions (chat)
/// - Streaming completions (chat_stream)
/// - Health checking
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Returns the backend name for identification and logging.
    fn name(&self) -> &str;

    /// Send a prompt and get the complete answer text.
    async fn chat(&self, prompt: &str, options: &GenerationOptions) -> GenerationResult<String>;

    /// Stream an answer via a channel.
    ///
    /// Implementations emit `TextDelta` events as chunks arrive and a
    /// terminal `Complete` event when the stream ends normally, then return
    /// the full answer text. A send failure on `tx` means the consumer went
    /// away; implementations should stop producing and return.
    async fn chat_stream(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        tx: mpsc::Sender<AnswerStreamEvent>,
    ) -> GenerationResult<String>;

    /// Check if the backend is healthy and reachable.
    async fn health_check(&self) -> GenerationResult<()> {
        Ok(())
    }
}
