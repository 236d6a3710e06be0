use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, watch};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::{
    backend::{BackendError, GenerationBackend},
    config::{RetryPolicy, StudioConfig},
    error::{GenerationError, Result},
    logger,
    models::{Generation, GenerationRequest, GenerationState, GenerationStatus},
};

const TRANSITION_BUFFER: usize = 64;

/// The attempt that currently owns the state. Only the holder of the matching
/// id may publish transitions.
struct ActiveAttempt {
    id: u64,
    token: CancellationToken,
}

/// Aborts attempt `id` if its `generate` future is dropped while it still
/// owns the state.
struct AttemptGuard<'a> {
    controller: &'a GenerationController,
    id: u64,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        let mut ownership = self.controller.lock();
        match &ownership.active {
            Some(active) if active.id == self.id => {}
            _ => return,
        }
        self.controller.abort_owned(&mut ownership, "dropped before completion");
    }
}

#[derive(Default)]
struct Ownership {
    next_id: u64,
    active: Option<ActiveAttempt>,
}

struct Inner {
    backend: Arc<dyn GenerationBackend>,
    policy: RetryPolicy,
    history_limit: usize,
    ownership: Mutex<Ownership>,
    state_tx: watch::Sender<GenerationState>,
    transitions_tx: broadcast::Sender<GenerationState>,
}

/// Drives one generation at a time against a [`GenerationBackend`]: retries
/// overloads with linear backoff, honours abort/reset, and publishes every
/// state change as an immutable [`GenerationState`] snapshot.
///
/// The handle is cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct GenerationController {
    inner: Arc<Inner>,
}

impl GenerationController {
    pub fn new(backend: Arc<dyn GenerationBackend>, policy: RetryPolicy) -> Self {
        Self::build(backend, policy, StudioConfig::default().history_limit)
    }

    pub fn from_config(backend: Arc<dyn GenerationBackend>, config: &StudioConfig) -> Self {
        Self::build(backend, config.retry.clone(), config.history_limit)
    }

    fn build(backend: Arc<dyn GenerationBackend>, policy: RetryPolicy, history_limit: usize) -> Self {
        let (state_tx, _) = watch::channel(GenerationState::default());
        let (transitions_tx, _) = broadcast::channel(TRANSITION_BUFFER);

        Self {
            inner: Arc::new(Inner {
                backend,
                policy,
                history_limit,
                ownership: Mutex::new(Ownership::default()),
                state_tx,
                transitions_tx,
            }),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    /// Current snapshot.
    pub fn state(&self) -> GenerationState {
        self.inner.state_tx.borrow().clone()
    }

    /// Receiver that always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.inner.state_tx.subscribe()
    }

    /// Receiver for every transition published from now on, in order.
    pub fn transitions(&self) -> broadcast::Receiver<GenerationState> {
        self.inner.transitions_tx.subscribe()
    }

    pub fn transition_stream(&self) -> impl Stream<Item = GenerationState> + Send + 'static {
        BroadcastStream::new(self.transitions()).filter_map(|item| item.ok())
    }

    /// Runs one logical generation to completion.
    ///
    /// Any attempt already in flight is cancelled first and its eventual
    /// outcome is ignored. Overloads are retried up to `max_retries` times,
    /// sleeping `base_backoff * attempt` between tries. Returns
    /// [`GenerationError::Cancelled`] if this call is aborted, reset or
    /// superseded.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<Generation, GenerationError> {
        let (id, token) = self.begin();
        let _guard = AttemptGuard {
            controller: self,
            id,
        };
        let max_retries = self.inner.policy.max_retries;
        let mut attempt: u32 = 1;

        log::info!(
            "[gen:{}] Generating '{}' in {} style",
            id,
            request.prompt,
            request.style
        );

        loop {
            let outcome = {
                let _timer = logger::timer(&format!("gen:{} attempt {}", id, attempt));
                self.inner
                    .backend
                    .create_generation(&request, token.clone())
                    .await
            };

            // A result that raced with cancellation is dropped.
            let outcome = match outcome {
                Ok(_) if token.is_cancelled() => Err(BackendError::Cancelled),
                other => other,
            };

            match outcome {
                Ok(generation) => {
                    let result = generation.clone();
                    let retry_count = attempt - 1;
                    let applied = self.transition(id, true, move |_| GenerationState {
                        status: GenerationStatus::Success,
                        error: None,
                        result: Some(result),
                        retry_count,
                    });
                    if !applied {
                        return Err(self.discarded(id, "success"));
                    }
                    log::info!("[gen:{}] Generation {} ready", id, generation.id);
                    return Ok(generation);
                }
                Err(BackendError::Cancelled) => {
                    // Normally abort/reset/supersede already published; this
                    // covers a backend that cancelled on its own.
                    self.transition(id, true, |prev| GenerationState {
                        status: GenerationStatus::Aborted,
                        error: Some(GenerationError::Cancelled.to_string()),
                        ..prev.clone()
                    });
                    log::info!("[gen:{}] Cancelled on attempt {}", id, attempt);
                    return Err(GenerationError::Cancelled);
                }
                Err(err) if err.is_transient() && attempt <= max_retries => {
                    let delay = self.inner.policy.backoff_for(attempt);
                    let applied = self.transition(id, false, |prev| GenerationState {
                        status: GenerationStatus::Retrying,
                        error: None,
                        result: prev.result.clone(),
                        retry_count: attempt,
                    });
                    if !applied {
                        return Err(self.discarded(id, "retry"));
                    }
                    log::warn!(
                        "[gen:{}] {} on attempt {}, retrying in {}ms ({}/{})",
                        id,
                        err,
                        attempt,
                        delay.as_millis(),
                        attempt,
                        max_retries
                    );

                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            log::info!("[gen:{}] Cancelled during backoff", id);
                            return Err(GenerationError::Cancelled);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(err) => {
                    let error = if err.is_transient() {
                        GenerationError::Exhausted {
                            retries: max_retries,
                        }
                    } else {
                        GenerationError::Failed(err.to_string())
                    };
                    let message = error.to_string();
                    let retry_count = attempt - 1;
                    let applied = self.transition(id, true, move |_| GenerationState {
                        status: GenerationStatus::Error,
                        error: Some(message),
                        result: None,
                        retry_count,
                    });
                    if !applied {
                        return Err(self.discarded(id, "failure"));
                    }
                    log::error!("[gen:{}] {}", id, error);
                    return Err(error);
                }
            }
        }
    }

    /// Cancels the in-flight attempt, if any, and freezes the state as
    /// `aborted`. Does nothing when idle or already finished.
    pub fn abort(&self) {
        let mut ownership = self.lock();
        self.abort_owned(&mut ownership, "aborted");
    }

    /// Returns to `idle`, cancelling anything in flight.
    pub fn reset(&self) {
        let mut ownership = self.lock();
        let cancelled = ownership.active.take();
        if let Some(active) = &cancelled {
            active.token.cancel();
            log::info!("[gen:{}] Cancelled by reset", active.id);
        }

        if cancelled.is_none() && *self.inner.state_tx.borrow() == GenerationState::default() {
            return;
        }
        self.publish(GenerationState::default());
    }

    /// The studio's history panel: most recent generations, newest first.
    pub async fn recent_generations(&self) -> Result<Vec<Generation>> {
        let generations = self
            .inner
            .backend
            .recent_generations(self.inner.history_limit)
            .await?;
        Ok(generations)
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let mut ownership = self.lock();
        if let Some(previous) = ownership.active.take() {
            previous.token.cancel();
            log::debug!("[gen:{}] Superseded by a new request", previous.id);
        }

        ownership.next_id += 1;
        let id = ownership.next_id;
        let token = CancellationToken::new();
        ownership.active = Some(ActiveAttempt {
            id,
            token: token.clone(),
        });

        let prev = self.state();
        self.publish(GenerationState {
            status: GenerationStatus::Loading,
            error: None,
            result: prev.result,
            retry_count: 0,
        });

        (id, token)
    }

    /// Publishes `next(current)` if attempt `id` still owns the state.
    /// `finish` releases ownership in the same critical section.
    fn transition<F>(&self, id: u64, finish: bool, next: F) -> bool
    where
        F: FnOnce(&GenerationState) -> GenerationState,
    {
        let mut ownership = self.lock();
        match &ownership.active {
            Some(active) if active.id == id => {}
            _ => return false,
        }
        if finish {
            ownership.active = None;
        }

        let state = next(&self.state());
        self.publish(state);
        true
    }

    fn abort_owned(&self, ownership: &mut Ownership, reason: &str) {
        let Some(active) = ownership.active.take() else {
            return;
        };
        active.token.cancel();

        let prev = self.state();
        self.publish(GenerationState {
            status: GenerationStatus::Aborted,
            error: Some(GenerationError::Cancelled.to_string()),
            ..prev
        });
        log::info!("[gen:{}] Aborted: {}", active.id, reason);
    }

    fn discarded(&self, id: u64, what: &str) -> GenerationError {
        log::debug!("[gen:{}] Discarding stale {}", id, what);
        GenerationError::Cancelled
    }

    // Callers hold the ownership lock so transitions are totally ordered.
    fn publish(&self, state: GenerationState) {
        log::debug!(
            "State -> {} (retry {}{})",
            state.status,
            state.retry_count,
            state
                .error
                .as_deref()
                .map(|e| format!(", error: {}", e))
                .unwrap_or_default()
        );
        self.inner.state_tx.send_replace(state.clone());
        let _ = self.inner.transitions_tx.send(state);
    }

    fn lock(&self) -> MutexGuard<'_, Ownership> {
        self.inner
            .ownership
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
