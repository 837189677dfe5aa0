//! Resilient Generation Client
//!
//! Wraps a `GenerationBackend` with three orthogonal policies, applied per
//! attempt in this order: circuit-breaker admission, deadline-bounded call,
//! bounded retry with backoff for transient failures.
//!
//! Policy state is shared per logical endpoint name through an injected
//! `ResilienceRegistry` owned by the application's composition root, so
//! failures against one backend affect only calls routed to that backend
//! and no ambient global state exists.
//!
//! For streaming, the policies compose over the stream lifecycle: the time
//! limiter bounds the wait for the first chunk, retry applies only before
//! any event has been forwarded, and a mid-stream failure terminates the
//! stream with an explicit `Error` event. If the consumer drops its
//! receiver, the upstream task is aborted and the text accumulated so far
//! is returned (`completed = false`) so the caller can persist the partial
//! answer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::backend::GenerationBackend;
use crate::breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::retry::RetryPolicy;
use crate::types::{GenerationError, GenerationOptions, GenerationResult};
use ragline_core::streaming::AnswerStreamEvent;

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// Resilience policies for one logical endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResiliencePolicies {
    /// Retry policy for transient failures.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Circuit breaker configuration.
    #[serde(default)]
    pub breaker: CircuitBreakerConfig,
    /// Deadline for a single-answer call, in milliseconds.
    pub request_timeout_ms: u64,
    /// Deadline for the first streamed chunk, in milliseconds.
    pub first_chunk_timeout_ms: u64,
}

impl Default for ResiliencePolicies {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            breaker: CircuitBreakerConfig::default(),
            request_timeout_ms: 30_000,
            first_chunk_timeout_ms: 10_000,
        }
    }
}

/// Per-endpoint runtime state: the configured policies plus the live
/// breaker shared by every call routed to that endpoint.
#[derive(Debug)]
pub struct EndpointState {
    policies: ResiliencePolicies,
    breaker: CircuitBreaker,
}

impl EndpointState {
    fn new(policies: ResiliencePolicies) -> Self {
        let breaker = CircuitBreaker::new(policies.breaker.clone());
        Self { policies, breaker }
    }

    /// The policies configured for this endpoint.
    pub fn policies(&self) -> &ResiliencePolicies {
        &self.policies
    }

    /// Current breaker state for this endpoint.
    pub fn breaker_state(&self) -> CircuitState {
        self.breaker.state()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registry of per-endpoint resilience state, keyed by endpoint name.
///
/// Constructed once at the composition root and handed by `Arc` to every
/// `ResilientGenerationClient`; endpoints not registered explicitly are
/// created on first use from the default policies.
#[derive(Debug)]
pub struct ResilienceRegistry {
    defaults: ResiliencePolicies,
    endpoints: DashMap<String, Arc<EndpointState>>,
}

impl ResilienceRegistry {
    /// Create a registry with the given default policies.
    pub fn new(defaults: ResiliencePolicies) -> Self {
        Self {
            defaults,
            endpoints: DashMap::new(),
        }
    }

    /// Register explicit policies for an endpoint, replacing its state.
    pub fn register(&self, endpoint: impl Into<String>, policies: ResiliencePolicies) {
        self.endpoints
            .insert(endpoint.into(), Arc::new(EndpointState::new(policies)));
    }

    /// Fetch (or lazily create) the state for an endpoint.
    pub fn endpoint(&self, name: &str) -> Arc<EndpointState> {
        self.endpoints
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(EndpointState::new(self.defaults.clone())))
            .clone()
    }

    /// Breaker state for an endpoint, if it has been used or registered.
    pub fn breaker_state(&self, name: &str) -> Option<CircuitState> {
        self.endpoints.get(name).map(|ep| ep.breaker_state())
    }
}

impl Default for ResilienceRegistry {
    fn default() -> Self {
        Self::new(ResiliencePolicies::default())
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Outcome of a streaming generation call.
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    /// Full answer text, or the partial text accumulated before the
    /// consumer disconnected.
    pub text: String,
    /// `false` when the consumer dropped its receiver mid-stream.
    pub completed: bool,
}

/// Generation client applying retry, circuit breaking, and time limiting
/// around a `GenerationBackend`.
pub struct ResilientGenerationClient {
    backend: Arc<dyn GenerationBackend>,
    endpoint: String,
    registry: Arc<ResilienceRegistry>,
}

enum StreamAttempt {
    Completed(String),
    Cancelled(String),
    Failed {
        error: GenerationError,
        streamed_any: bool,
    },
}

impl ResilientGenerationClient {
    /// Create a client routing calls to `endpoint` through `registry`.
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        endpoint: impl Into<String>,
        registry: Arc<ResilienceRegistry>,
    ) -> Self {
        Self {
            backend,
            endpoint: endpoint.into(),
            registry,
        }
    }

    /// Logical endpoint name this client routes to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Check backend health without engaging any policy.
    pub async fn health_check(&self) -> GenerationResult<()> {
        self.backend.health_check().await
    }

    /// Generate a complete answer under the endpoint's policies.
    pub async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> GenerationResult<String> {
        let ep = self.registry.endpoint(&self.endpoint);
        let deadline = Duration::from_millis(ep.policies.request_timeout_ms);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if !ep.breaker.try_acquire() {
                return Err(GenerationError::CircuitOpen {
                    endpoint: self.endpoint.clone(),
                });
            }

            let started = Instant::now();
            let result = match timeout(deadline, self.backend.chat(prompt, options)).await {
                Ok(inner) => inner,
                Err(_) => Err(GenerationError::Timeout {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }),
            };

            match result {
                Ok(text) => {
                    ep.breaker.record_success();
                    return Ok(text);
                }
                Err(err) => {
                    ep.breaker.record_failure();
                    if err.is_transient() && attempt < ep.policies.retry.max_attempts {
                        let delay = ep.policies.retry.backoff_delay(attempt);
                        tracing::warn!(
                            endpoint = %self.endpoint,
                            attempt,
                            error = %err,
                            "generation attempt failed, retrying in {:?}",
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Stream an answer under the endpoint's policies.
    ///
    /// Events are forwarded to `tx` as they arrive. Establishing the stream
    /// (anything before the first forwarded event) is retried like a
    /// single-answer call; once chunks have reached the consumer a failure
    /// is terminal and is surfaced both as an `Error` event and as the
    /// returned error.
    pub async fn generate_stream(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        tx: &mpsc::Sender<AnswerStreamEvent>,
    ) -> GenerationResult<StreamOutcome> {
        let ep = self.registry.endpoint(&self.endpoint);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if !ep.breaker.try_acquire() {
                let err = GenerationError::CircuitOpen {
                    endpoint: self.endpoint.clone(),
                };
                let _ = tx
                    .send(AnswerStreamEvent::Error {
                        message: err.to_string(),
                        code: Some(err.code().to_string()),
                    })
                    .await;
                return Err(err);
            }

            match self.stream_attempt(&ep, prompt, options, tx).await {
                StreamAttempt::Completed(text) => {
                    ep.breaker.record_success();
                    return Ok(StreamOutcome {
                        text,
                        completed: true,
                    });
                }
                StreamAttempt::Cancelled(partial) => {
                    // The backend held up its end; only the consumer left.
                    ep.breaker.record_success();
                    tracing::debug!(
                        endpoint = %self.endpoint,
                        partial_len = partial.len(),
                        "stream consumer disconnected, returning partial text"
                    );
                    return Ok(StreamOutcome {
                        text: partial,
                        completed: false,
                    });
                }
                StreamAttempt::Failed {
                    error,
                    streamed_any,
                } => {
                    ep.breaker.record_failure();
                    if error.is_transient()
                        && !streamed_any
                        && attempt < ep.policies.retry.max_attempts
                    {
                        let delay = ep.policies.retry.backoff_delay(attempt);
                        tracing::warn!(
                            endpoint = %self.endpoint,
                            attempt,
                            error = %error,
                            "stream attempt failed before first chunk, retrying in {:?}",
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    let _ = tx
                        .send(AnswerStreamEvent::Error {
                            message: error.to_string(),
                            code: Some(error.code().to_string()),
                        })
                        .await;
                    return Err(error);
                }
            }
        }
    }

    /// One streaming attempt: spawn the backend into an internal channel,
    /// enforce the first-chunk deadline, forward events, and accumulate the
    /// text buffer owned by this task.
    async fn stream_attempt(
        &self,
        ep: &EndpointState,
        prompt: &str,
        options: &GenerationOptions,
        tx: &mpsc::Sender<AnswerStreamEvent>,
    ) -> StreamAttempt {
        let (btx, mut brx) = mpsc::channel::<AnswerStreamEvent>(32);
        let backend = Arc::clone(&self.backend);
        let prompt_owned = prompt.to_string();
        let opts = options.clone();
        let task =
            tokio::spawn(async move { backend.chat_stream(&prompt_owned, &opts, btx).await });

        let first_chunk = Duration::from_millis(ep.policies.first_chunk_timeout_ms);
        let mut buffer = String::new();
        let mut streamed_any = false;

        loop {
            let next = if streamed_any {
                brx.recv().await
            } else {
                match timeout(first_chunk, brx.recv()).await {
                    Ok(event) => event,
                    Err(_) => {
                        task.abort();
                        return StreamAttempt::Failed {
                            error: GenerationError::Timeout {
                                elapsed_ms: first_chunk.as_millis() as u64,
                            },
                            streamed_any: false,
                        };
                    }
                }
            };

            match next {
                Some(event) => {
                    if let AnswerStreamEvent::TextDelta { content } = &event {
                        buffer.push_str(content);
                    }
                    streamed_any = true;
                    if tx.send(event).await.is_err() {
                        task.abort();
                        return StreamAttempt::Cancelled(buffer);
                    }
                }
                None => break,
            }
        }

        match task.await {
            Ok(Ok(text)) => StreamAttempt::Completed(text),
            Ok(Err(error)) => StreamAttempt::Failed {
                error,
                streamed_any,
            },
            Err(join_err) => StreamAttempt::Failed {
                error: GenerationError::other(format!("stream task failed: {}", join_err)),
                streamed_any,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
