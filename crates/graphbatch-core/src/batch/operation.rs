//! A queued logical call and its batch descriptor.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::api::{appsecret_proof, CallOptions, CallOutcome, GraphCall, Transform};
use crate::request::{encode_params, ArgValue, HttpComponent, UploadableFile, Verb};

// Process-wide so attachment keys never collide, even across sessions.
static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

/// One element of the `batch` array sent to the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDescriptor {
    pub method: Verb,
    pub relative_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    /// Comma-separated keys of the uploads this call refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_files: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omit_response_on_success: Option<bool>,
}

/// A call waiting in a batch session.
///
/// Everything but `attempts` and the one-shot `transform` is fixed at
/// enqueue time, including the resolved credential.
pub struct QueuedCall {
    id: u64,
    path: String,
    args: BTreeMap<String, String>,
    files: IndexMap<String, UploadableFile>,
    verb: Verb,
    access_token: Option<String>,
    options: CallOptions,
    transform: Option<Transform>,
    attempts: u32,
}

impl fmt::Debug for QueuedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedCall")
            .field("id", &self.id)
            .field("verb", &self.verb)
            .field("path", &self.path)
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for QueuedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op{} {} {}", self.id, self.verb, self.path)
    }
}

impl QueuedCall {
    /// Capture `call`, resolving its credential against `default_token`.
    pub fn new(call: GraphCall, default_token: Option<&str>) -> Self {
        let id = NEXT_OPERATION_ID.fetch_add(1, Ordering::Relaxed);
        let GraphCall {
            path,
            args,
            verb,
            options,
            transform,
        } = call;

        let mut form_args = BTreeMap::new();
        let mut files = IndexMap::new();
        for (key, value) in args {
            match value {
                ArgValue::File(file) => {
                    files.insert(format!("op{id}_file{}", files.len()), file);
                }
                other => {
                    if let Some(v) = other.to_form_value() {
                        form_args.insert(key, v);
                    }
                }
            }
        }

        let access_token = options
            .access_token
            .clone()
            .or_else(|| default_token.map(str::to_string));

        Self {
            id,
            path,
            args: form_args,
            files,
            verb,
            access_token,
            options,
            transform,
            attempts: 1,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn options(&self) -> &CallOptions {
        &self.options
    }

    pub fn http_component(&self) -> HttpComponent {
        self.options.http_component
    }

    pub fn files(&self) -> &IndexMap<String, UploadableFile> {
        &self.files
    }

    /// How many times this call has been sent, starting at 1.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn bump_attempts(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Run the transform (at most once) and return the final outcome.
    pub(crate) fn finalize(&mut self, outcome: CallOutcome) -> CallOutcome {
        match self.transform.take() {
            Some(f) => f(outcome),
            None => outcome,
        }
    }

    /// Describe this call for the `batch` array.
    ///
    /// A credential other than the batch token travels with the call,
    /// together with its `appsecret_proof` when an app secret is known.
    pub fn to_descriptor(&self, batch_token: Option<&str>, app_secret: Option<&str>) -> BatchDescriptor {
        let mut args = self.args.clone();
        if let Some(token) = self.access_token.as_deref() {
            if Some(token) != batch_token {
                args.insert("access_token".to_string(), token.to_string());
                if let Some(proof) = app_secret.and_then(|secret| appsecret_proof(secret, token)) {
                    args.insert("appsecret_proof".to_string(), proof);
                }
            }
        }

        let encoded = encode_params(&args);
        let mut relative_url = self.path.clone();
        let mut body = None;
        if !encoded.is_empty() {
            if self.verb.args_in_url() {
                relative_url.push(if self.path.contains('?') { '&' } else { '?' });
                relative_url.push_str(&encoded);
            } else {
                body = Some(encoded);
            }
        }

        let attached_files = if self.files.is_empty() {
            None
        } else {
            Some(self.files.keys().cloned().collect::<Vec<_>>().join(","))
        };

        let batch_args = &self.options.batch_args;
        BatchDescriptor {
            method: self.verb,
            relative_url,
            body,
            name: batch_args.name.clone(),
            depends_on: batch_args.depends_on.clone(),
            attached_files,
            omit_response_on_success: batch_args.omit_response_on_success,
        }
    }
}
