//! Batch sessions: queue logical calls, execute them as batch requests.
//!
//! ```text
//! enqueue ─▶ queue ─▶ chunk (≤ MAX_CALLS) ─▶ transport ─▶ demux ─┬─▶ outcomes
//!                                                                 └─▶ retry round (null slots)
//! ```
//!
//! `execute` runs in rounds. Round 1 sends every queued call, chunked in
//! enqueue order. Calls whose slot came back `null` are collected and sent
//! again in round 2, then round 3, each re-chunked at [`MAX_CALLS`]. Outcomes
//! appear in processing order: round 1 in enqueue order, then round 2, then
//! round 3.

pub mod chunk;
pub mod demux;
pub mod operation;
pub mod retry;

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::api::{CallOutcome, Credentials, GraphApi, GraphCall};
use crate::error::{BatchError, GraphError};
use crate::request::{TransportOptions, Verb};

pub use chunk::{build_chunk, MAX_CALLS};
pub use demux::{demux_slot, parse_composite, SlotOutcome};
pub use operation::{BatchDescriptor, QueuedCall};
pub use retry::{MissingDecision, RetryCoordinator, MAX_ATTEMPTS};

/// Configuration for a [`BatchSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Calls per batch request; clamped to `1..=MAX_CALLS`.
    pub max_calls: usize,
    /// Times a call with a `null` slot is sent before it fails.
    pub max_attempts: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_calls: MAX_CALLS,
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl BatchConfig {
    pub fn chunk_size(&self) -> usize {
        self.max_calls.clamp(1, MAX_CALLS)
    }
}

/// A single-use queue of calls executed as batch requests.
///
/// Keeps the originating [`GraphApi`] for transport and for binding
/// paginated results, separately from its own batch [`Credentials`].
/// Do not run `execute` concurrently on one session.
pub struct BatchSession {
    origin: Arc<GraphApi>,
    credentials: Credentials,
    queue: Mutex<VecDeque<QueuedCall>>,
    config: BatchConfig,
}

impl fmt::Debug for BatchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchSession")
            .field("origin", &self.origin)
            .field("queued", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl BatchSession {
    /// Session on `origin` with the default [`BatchConfig`].
    pub fn new(origin: Arc<GraphApi>) -> Self {
        Self::with_config(origin, BatchConfig::default())
    }

    /// Session on `origin`; the batch request is signed with a snapshot of
    /// its credentials taken here.
    pub fn with_config(origin: Arc<GraphApi>, config: BatchConfig) -> Self {
        let credentials = origin.credentials().clone();
        Self {
            origin,
            credentials,
            queue: Mutex::new(VecDeque::new()),
            config,
        }
    }

    /// The session results and page fetches are bound to.
    pub fn origin(&self) -> &Arc<GraphApi> {
        &self.origin
    }

    /// Credentials the outer batch request is signed with.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Chunk size and attempt budget.
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Number of calls waiting for `execute`.
    pub fn len(&self) -> usize {
        self.lock_queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_queue().is_empty()
    }

    /// Queue `call`. Nothing is sent and the transform is not run yet.
    pub fn enqueue(&self, call: GraphCall) {
        let op = QueuedCall::new(call, self.credentials.access_token.as_deref());
        debug!(call = %op, "queued batch call");
        self.lock_queue().push_back(op);
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<QueuedCall>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send every queued call and return one outcome per call.
    ///
    /// Per-call API errors are returned as `Err` elements. A failed
    /// transport, a failed outer request or an empty composite body aborts
    /// with no partial results.
    pub async fn execute(&self, options: &TransportOptions) -> Result<Vec<CallOutcome>, BatchError> {
        let pending: Vec<QueuedCall> = self.lock_queue().drain(..).collect();
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let retry = RetryCoordinator::new(self.config.max_attempts);
        let chunk_size = self.config.chunk_size();
        let mut results = Vec::with_capacity(pending.len());
        let mut round = pending;
        let mut round_no = 1u32;

        while !round.is_empty() {
            debug!(round = round_no, calls = round.len(), "executing batch round");
            let mut requeued = Vec::new();
            let mut remaining = round.into_iter();
            loop {
                let chunk: Vec<QueuedCall> = remaining.by_ref().take(chunk_size).collect();
                if chunk.is_empty() {
                    break;
                }
                self.run_chunk(chunk, options, &retry, &mut results, &mut requeued)
                    .await?;
            }
            round = requeued;
            round_no += 1;
        }

        Ok(results)
    }

    async fn run_chunk(
        &self,
        chunk: Vec<QueuedCall>,
        options: &TransportOptions,
        retry: &RetryCoordinator,
        results: &mut Vec<CallOutcome>,
        requeued: &mut Vec<QueuedCall>,
    ) -> Result<(), BatchError> {
        let params = build_chunk(&chunk, &self.credentials)?;
        debug!(
            calls = chunk.len(),
            files = params.files.len(),
            endpoint = %self.origin.transport().endpoint(),
            "submitting batch request"
        );

        let response = self
            .origin
            .submit_signed(&self.credentials, "/", params, Verb::Post, options)
            .await?;
        let slots = parse_composite(&response)?;
        if slots.len() != chunk.len() {
            warn!(
                expected = chunk.len(),
                received = slots.len(),
                "batch response length does not match request"
            );
        }

        let mut slots = slots.into_iter();
        for mut call in chunk {
            let slot = slots.next().flatten();
            match demux_slot(slot.as_ref(), &call, &self.origin) {
                SlotOutcome::Resolved(outcome) => results.push(call.finalize(outcome)),
                SlotOutcome::Missing => match retry.on_missing(&mut call) {
                    MissingDecision::Requeue { attempt } => {
                        warn!(call = %call, attempt, "no response for batch call, requeuing");
                        requeued.push(call);
                    }
                    MissingDecision::Exhausted => {
                        warn!(call = %call, attempts = call.attempts(), "no response for batch call, giving up");
                        results.push(call.finalize(Err(GraphError::no_response())));
                    }
                },
            }
        }
        Ok(())
    }
}
