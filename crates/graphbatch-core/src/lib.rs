//! graphbatch-core — batch call engine and shared types for graph-style APIs.
//!
//! # Overview
//!
//! Graph-style HTTP APIs accept up to [`MAX_CALLS`] logical calls bundled
//! into one physical request. This crate queues calls against a
//! [`BatchSession`], sends them in as few requests as possible and hands
//! back one outcome per call, shaped exactly like a non-batched call would
//! have been.
//!
//! - [`GraphTransport`] — the async trait every transport implements
//! - [`GraphApi`] — a non-batched session (credentials + transport)
//! - [`BatchSession`] — queue, chunking, demultiplexing and retries
//! - [`CallStrategy`] — immediate vs. queuing submission of a [`GraphCall`]
//! - [`GraphError`] / [`BatchError`] — per-call and fatal error types
//! - [`GraphCollection`] — paginated results bound to the originating session

pub mod api;
pub mod batch;
pub mod classify;
pub mod collection;
pub mod error;
pub mod request;
pub mod response;
pub mod strategy;
pub mod transport;

pub use api::{CallOptions, CallOutcome, Credentials, GraphApi, GraphCall, Transform};
pub use batch::{BatchConfig, BatchSession, MAX_ATTEMPTS, MAX_CALLS};
pub use collection::{GraphCollection, GraphValue, PageRequest};
pub use error::{BatchError, GraphError, GraphErrorKind, TransportError};
pub use request::{ArgValue, Args, BatchArgs, HttpComponent, RequestParams, TransportOptions, UploadableFile, Verb};
pub use response::RawResponse;
pub use strategy::{CallStrategy, ImmediateCallStrategy, QueuingCallStrategy, Submission};
pub use transport::GraphTransport;
