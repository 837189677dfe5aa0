//! Shared test doubles for the integration suite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use ragline::pipeline::search::{RetrievalError, VectorSearch};
use ragline::CompletionSink;
use ragline_core::document::{Document, RankedList, SearchRequest};
use ragline_core::streaming::AnswerStreamEvent;
use ragline_llm::{GenerationBackend, GenerationError, GenerationOptions, GenerationResult};

/// Marker the query expander's instruction always contains; used to tell
/// expansion calls apart from answer-generation calls on a shared backend.
pub const EXPANSION_MARKER: &str = "alternative phrasings";

// ---------------------------------------------------------------------------
// Vector index mocks
// ---------------------------------------------------------------------------

/// Index serving fixed ranked lists keyed by exact query text.
pub struct FixedIndex {
    lists: HashMap<String, RankedList>,
    calls: AtomicU32,
    /// Queries that fail with `RetrievalError::Unavailable`.
    failing_queries: Vec<String>,
}

impl FixedIndex {
    pub fn new(lists: HashMap<String, RankedList>) -> Self {
        Self {
            lists,
            calls: AtomicU32::new(0),
            failing_queries: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    pub fn with_failing_queries(mut self, queries: &[&str]) -> Self {
        self.failing_queries = queries.iter().map(|q| q.to_string()).collect();
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorSearch for FixedIndex {
    async fn search(&self, request: &SearchRequest) -> Result<RankedList, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_queries.iter().any(|q| q == &request.query) {
            return Err(RetrievalError::Unavailable(format!(
                "index down for '{}'",
                request.query
            )));
        }
        Ok(self.lists.get(&request.query).cloned().unwrap_or_default())
    }
}

/// Index that fails every request.
pub struct FailingIndex {
    calls: AtomicU32,
}

impl FailingIndex {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorSearch for FailingIndex {
    async fn search(&self, _request: &SearchRequest) -> Result<RankedList, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RetrievalError::Unavailable("index down".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Generation backend mock
// ---------------------------------------------------------------------------

/// Scripted backend shared by the expander and the generation client.
///
/// Expansion prompts are recognized by `EXPANSION_MARKER`; everything else
/// counts as answer generation.
pub struct ScriptedBackend {
    /// Line-separated expansion variants; `None` fails expansion calls.
    expansion: Option<String>,
    /// The generated answer.
    answer: String,
    /// Generation attempts that fail before one succeeds. `u32::MAX`
    /// fails forever.
    generation_failures: AtomicU32,
    /// Artificial latency per generation call.
    generation_delay: Duration,
    expansion_calls: AtomicU32,
    generation_calls: AtomicU32,
}

impl ScriptedBackend {
    pub fn new(expansion: Option<&str>, answer: &str) -> Self {
        Self {
            expansion: expansion.map(|s| s.to_string()),
            answer: answer.to_string(),
            generation_failures: AtomicU32::new(0),
            generation_delay: Duration::ZERO,
            expansion_calls: AtomicU32::new(0),
            generation_calls: AtomicU32::new(0),
        }
    }

    pub fn with_generation_failures(self, failures: u32) -> Self {
        self.generation_failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn with_generation_delay(mut self, delay: Duration) -> Self {
        self.generation_delay = delay;
        self
    }

    pub fn expansion_calls(&self) -> u32 {
        self.expansion_calls.load(Ordering::SeqCst)
    }

    pub fn generation_calls(&self) -> u32 {
        self.generation_calls.load(Ordering::SeqCst)
    }

    fn next_generation(&self) -> GenerationResult<String> {
        self.generation_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.generation_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != u32::MAX {
                self.generation_failures.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(GenerationError::ServerError {
                message: "backend exploded".to_string(),
                status: Some(500),
            });
        }
        Ok(self.answer.clone())
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, prompt: &str, _options: &GenerationOptions) -> GenerationResult<String> {
        if prompt.contains(EXPANSION_MARKER) {
            self.expansion_calls.fetch_add(1, Ordering::SeqCst);
            return match &self.expansion {
                Some(text) => Ok(text.clone()),
                None => Err(GenerationError::NetworkError {
                    message: "expansion backend unreachable".to_string(),
                }),
            };
        }

        tokio::time::sleep(self.generation_delay).await;
        self.next_generation()
    }

    async fn chat_stream(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        tx: mpsc::Sender<AnswerStreamEvent>,
    ) -> GenerationResult<String> {
        if prompt.contains(EXPANSION_MARKER) {
            return self.chat(prompt, options).await;
        }

        tokio::time::sleep(self.generation_delay).await;
        let answer = self.next_generation()?;

        let midpoint = answer.len() / 2;
        let mut split = midpoint;
        while !answer.is_char_boundary(split) {
            split += 1;
        }
        for range in [0..split, split..answer.len()] {
            let chunk = &answer[range];
            if chunk.is_empty() {
                continue;
            }
            if tx.send(AnswerStreamEvent::delta(chunk)).await.is_err() {
                return Ok(answer);
            }
        }
        let _ = tx
            .send(AnswerStreamEvent::Complete { stop_reason: None })
            .await;
        Ok(answer)
    }
}

// ---------------------------------------------------------------------------
// Completion sink
// ---------------------------------------------------------------------------

/// Sink recording every persisted (text, completed) pair.
pub struct RecordingSink {
    persisted: Mutex<Vec<(String, bool)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            persisted: Mutex::new(Vec::new()),
        })
    }

    pub fn persisted(&self) -> Vec<(String, bool)> {
        self.persisted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionSink for RecordingSink {
    async fn persist(&self, text: &str, completed: bool) {
        self.persisted
            .lock()
            .unwrap()
            .push((text.to_string(), completed));
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Shorthand for a document.
pub fn doc(id: &str, text: &str, score: f32) -> Document {
    Document::new(id, text, score)
}

/// Ranked lists keyed by query, from a compact literal.
pub fn lists(entries: &[(&str, &[Document])]) -> HashMap<String, RankedList> {
    entries
        .iter()
        .map(|(query, docs)| (query.to_string(), docs.to_vec()))
        .collect()
}
