//! graphbatch-http — `reqwest` transport for graphbatch.
//!
//! # Usage
//! ```rust,no_run
//! use graphbatch_core::{Credentials, GraphCall, TransportOptions};
//! use graphbatch_http::{connect, HttpClientConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let api = connect(Credentials::new("token"), HttpClientConfig::default())?;
//! let batch = api.batch();
//! batch.enqueue(GraphCall::get("me"));
//! batch.enqueue(GraphCall::get("me/friends"));
//! for outcome in batch.execute(&TransportOptions::default()).await? {
//!     println!("{outcome:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod retry;

use std::sync::Arc;

use graphbatch_core::{Credentials, GraphApi, TransportError};

pub use client::{HttpClientConfig, HttpGraphClient};
pub use retry::RetryConfig;

/// Build a [`GraphApi`] that talks HTTP.
pub fn connect(credentials: Credentials, config: HttpClientConfig) -> Result<Arc<GraphApi>, TransportError> {
    let client = HttpGraphClient::new(config)?;
    Ok(GraphApi::new(credentials, Arc::new(client)))
}
