//! Error types: transport failures, per-call API errors and fatal batch errors.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message carried by the error synthesized for a call that never got a slot.
pub const NO_RESPONSE_MESSAGE: &str = "No response from the service";

/// Errors raised while moving bytes to and from the API.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection error: {0}")]
    Connect(String),

    /// HTTP request failed after the connection was made.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The request could not be built (bad URL, bad MIME type, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if the request never reached the API and can be resent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Timeout { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Error class of a [`GraphError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphErrorKind {
    /// The request was rejected (bad parameters, missing object, ...).
    Client,
    /// The API failed without a structured error body.
    Server,
    /// The access token is invalid, expired or lacks a permission.
    Authentication,
}

impl fmt::Display for GraphErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client error"),
            Self::Server => write!(f, "server error"),
            Self::Authentication => write!(f, "authentication error"),
        }
    }
}

/// An API-level failure of one logical call.
///
/// In a batch this is data, not control flow: it lands in the failing
/// call's outcome slot and never interrupts sibling calls.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphError {
    pub kind: GraphErrorKind,
    pub http_status: u16,
    pub response_body: String,
    pub error_type: Option<String>,
    pub code: Option<i64>,
    pub error_subcode: Option<i64>,
    pub message: Option<String>,
    pub user_title: Option<String>,
    pub user_msg: Option<String>,
    pub fbtrace_id: Option<String>,
    /// Debug headers echoed by the API (`x-fb-debug`, `x-fb-rev`, `x-fb-trace-id`).
    pub debug_headers: IndexMap<String, String>,
}

impl GraphError {
    pub fn new(kind: GraphErrorKind, http_status: u16, response_body: impl Into<String>) -> Self {
        Self {
            kind,
            http_status,
            response_body: response_body.into(),
            error_type: None,
            code: None,
            error_subcode: None,
            message: None,
            user_title: None,
            user_msg: None,
            fbtrace_id: None,
            debug_headers: IndexMap::new(),
        }
    }

    /// A client error raised locally rather than parsed from an API response.
    pub fn client(http_status: u16, response_body: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new(GraphErrorKind::Client, http_status, response_body);
        err.message = Some(message.into());
        err
    }

    /// The error a batched call resolves to once its retry budget is spent.
    pub fn no_response() -> Self {
        Self::client(404, "", NO_RESPONSE_MESSAGE)
    }

    pub fn is_authentication(&self) -> bool {
        self.kind == GraphErrorKind::Authentication
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(t) = &self.error_type {
            parts.push(format!("type: {t}"));
        }
        if let Some(c) = self.code {
            parts.push(format!("code: {c}"));
        }
        if let Some(s) = self.error_subcode {
            parts.push(format!("error_subcode: {s}"));
        }
        if let Some(m) = &self.message {
            parts.push(format!("message: {m}"));
        }
        if let Some(t) = &self.user_title {
            parts.push(format!("error_user_title: {t}"));
        }
        if let Some(m) = &self.user_msg {
            parts.push(format!("error_user_msg: {m}"));
        }
        if let Some(id) = &self.fbtrace_id {
            parts.push(format!("fbtrace_id: {id}"));
        }
        for (name, value) in &self.debug_headers {
            parts.push(format!("{name}: {value}"));
        }

        if parts.is_empty() {
            write!(f, "{}", self.kind)?;
            if !self.response_body.is_empty() {
                write!(f, ": {}", self.response_body)?;
            }
        } else {
            write!(f, "{}", parts.join(", "))?;
        }
        write!(f, " [HTTP {}]", self.http_status)
    }
}

impl std::error::Error for GraphError {}

/// Failures that abort a whole `execute()` (or a non-batched call).
#[derive(Debug, Error)]
pub enum BatchError {
    /// The response was missing, empty or not the expected shape.
    #[error("bad response (HTTP {status}): {message}")]
    BadResponse {
        status: u16,
        body: String,
        message: String,
    },

    /// The API rejected the request as a whole.
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response or request body could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Returned when parsing an HTTP verb we do not send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported HTTP verb: {0}")]
pub struct UnknownVerb(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_response_is_a_client_404() {
        let err = GraphError::no_response();
        assert_eq!(err.kind, GraphErrorKind::Client);
        assert_eq!(err.http_status, 404);
        assert_eq!(err.message.as_deref(), Some(NO_RESPONSE_MESSAGE));
        assert_eq!(err.to_string(), "message: No response from the service [HTTP 404]");
    }

    #[test]
    fn display_without_details_uses_body() {
        let err = GraphError::new(GraphErrorKind::Server, 503, "upstream down");
        assert_eq!(err.to_string(), "server error: upstream down [HTTP 503]");
    }

    #[test]
    fn only_pre_delivery_failures_are_retryable() {
        assert!(TransportError::Connect("refused".into()).is_retryable());
        assert!(TransportError::Timeout { ms: 10 }.is_retryable());
        assert!(!TransportError::Http("reset".into()).is_retryable());
    }
}
