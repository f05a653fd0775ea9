//! How a [`GraphCall`] is submitted: right away, or into a batch queue.
//!
//! Code written against [`CallStrategy`] runs unchanged inside or outside a
//! batch. The strategy is picked when the value is constructed.

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::{CallOutcome, GraphApi, GraphCall};
use crate::batch::BatchSession;
use crate::error::BatchError;
use crate::request::TransportOptions;

/// Result of submitting a call.
#[derive(Debug)]
pub enum Submission {
    /// The call ran and this is its outcome.
    Completed(CallOutcome),
    /// The call was queued; its outcome comes from a later `execute`.
    Queued,
}

impl Submission {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued)
    }

    pub fn into_outcome(self) -> Option<CallOutcome> {
        match self {
            Self::Completed(outcome) => Some(outcome),
            Self::Queued => None,
        }
    }
}

#[async_trait]
pub trait CallStrategy: Send + Sync {
    async fn submit(&self, call: GraphCall) -> Result<Submission, BatchError>;

    async fn get(&self, path: &str) -> Result<Submission, BatchError> {
        self.submit(GraphCall::get(path)).await
    }

    async fn delete(&self, path: &str) -> Result<Submission, BatchError> {
        self.submit(GraphCall::delete(path)).await
    }
}

/// Sends each call as its own request through a [`GraphApi`].
#[derive(Debug, Clone)]
pub struct ImmediateCallStrategy {
    api: Arc<GraphApi>,
}

impl ImmediateCallStrategy {
    pub fn new(api: Arc<GraphApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Arc<GraphApi> {
        &self.api
    }
}

#[async_trait]
impl CallStrategy for ImmediateCallStrategy {
    /// API errors become a completed `Err` outcome; only fatal failures are `Err`.
    async fn submit(&self, call: GraphCall) -> Result<Submission, BatchError> {
        match self.api.graph_call(call).await {
            Ok(value) => Ok(Submission::Completed(Ok(value))),
            Err(BatchError::Graph(err)) => Ok(Submission::Completed(Err(err))),
            Err(e) => Err(e),
        }
    }
}

/// Queues each call into a [`BatchSession`].
#[derive(Debug)]
pub struct QueuingCallStrategy {
    session: BatchSession,
}

impl QueuingCallStrategy {
    pub fn new(session: BatchSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &BatchSession {
        &self.session
    }

    /// Run everything queued so far.
    pub async fn execute(&self, options: &TransportOptions) -> Result<Vec<CallOutcome>, BatchError> {
        self.session.execute(options).await
    }
}

#[async_trait]
impl CallStrategy for QueuingCallStrategy {
    async fn submit(&self, call: GraphCall) -> Result<Submission, BatchError> {
        self.session.enqueue(call);
        Ok(Submission::Queued)
    }
}
