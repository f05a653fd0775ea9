//! The `GraphTransport` trait — the seam between the engine and HTTP.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::{RequestParams, TransportOptions, Verb};
use crate::response::RawResponse;

/// Issues one physical request and returns the raw response.
///
/// Implementations return every HTTP status as a [`RawResponse`]; API error
/// classification happens above this layer. Only failures to obtain a
/// response at all are [`TransportError`]s.
///
/// # Object Safety
/// The trait is object-safe and is stored as `Arc<dyn GraphTransport>`.
#[async_trait]
pub trait GraphTransport: Send + Sync + 'static {
    async fn submit(
        &self,
        path: &str,
        params: RequestParams,
        verb: Verb,
        options: &TransportOptions,
    ) -> Result<RawResponse, TransportError>;

    /// The server this transport talks to (for logs).
    fn endpoint(&self) -> &str;
}
