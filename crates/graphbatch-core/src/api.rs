//! Non-batched sessions, call descriptions and request signing.

use std::fmt;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::batch::BatchSession;
use crate::classify::check_response;
use crate::collection::{GraphCollection, GraphValue};
use crate::error::{BatchError, GraphError};
use crate::request::{ArgValue, Args, BatchArgs, HttpComponent, RequestParams, TransportOptions, Verb};
use crate::response::{decode_body, select_component, RawResponse};
use crate::transport::GraphTransport;

/// Final result of one logical call: a value or a per-call API error.
pub type CallOutcome = Result<GraphValue, GraphError>;

/// Deferred post-processing of a call's outcome, run exactly once.
pub type Transform = Box<dyn FnOnce(CallOutcome) -> CallOutcome + Send>;

/// `hex(HMAC-SHA256(app_secret, access_token))`, sent as `appsecret_proof`.
pub fn appsecret_proof(app_secret: &str, access_token: &str) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()).ok()?;
    mac.update(access_token.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Access token and app secret of a session.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub app_secret: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("app_secret", &self.app_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            app_secret: None,
        }
    }

    pub fn with_app_secret(mut self, app_secret: impl Into<String>) -> Self {
        self.app_secret = Some(app_secret.into());
        self
    }

    /// Proof for `token` under this session's app secret, if one is configured.
    pub fn proof_for(&self, token: &str) -> Option<String> {
        appsecret_proof(self.app_secret.as_deref()?, token)
    }

    /// Add `access_token` (unless the call already set one) and its proof.
    pub(crate) fn sign(&self, params: &mut RequestParams) {
        if let Some(token) = &self.access_token {
            params
                .fields
                .entry("access_token".to_string())
                .or_insert_with(|| token.clone());
        }
        let proof = params
            .field("access_token")
            .and_then(|token| self.proof_for(token));
        if let Some(proof) = proof {
            params.fields.insert("appsecret_proof".to_string(), proof);
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Credential override for this call only.
    pub access_token: Option<String>,
    pub http_component: HttpComponent,
    pub batch_args: BatchArgs,
    pub transport: TransportOptions,
}

/// A logical call: what to request and how to post-process the answer.
pub struct GraphCall {
    pub path: String,
    pub args: Args,
    pub verb: Verb,
    pub options: CallOptions,
    pub transform: Option<Transform>,
}

impl fmt::Debug for GraphCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphCall")
            .field("path", &self.path)
            .field("args", &self.args)
            .field("verb", &self.verb)
            .field("options", &self.options)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

impl GraphCall {
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            args: Args::new(),
            verb,
            options: CallOptions::default(),
            transform: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Verb::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Verb::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Verb::Delete, path)
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.options.access_token = Some(token.into());
        self
    }

    pub fn http_component(mut self, component: HttpComponent) -> Self {
        self.options.http_component = component;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.batch_args.name = Some(name.into());
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.options.batch_args.depends_on = Some(name.into());
        self
    }

    pub fn omit_response_on_success(mut self, omit: bool) -> Self {
        self.options.batch_args.omit_response_on_success = Some(omit);
        self
    }

    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: FnOnce(CallOutcome) -> CallOutcome + Send + 'static,
    {
        self.transform = Some(Box::new(f));
        self
    }
}

/// A non-batched session: credentials plus a transport.
pub struct GraphApi {
    credentials: Credentials,
    transport: Arc<dyn GraphTransport>,
}

impl fmt::Debug for GraphApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphApi")
            .field("credentials", &self.credentials)
            .field("endpoint", &self.transport.endpoint())
            .finish()
    }
}

impl GraphApi {
    pub fn new(credentials: Credentials, transport: Arc<dyn GraphTransport>) -> Arc<Self> {
        Arc::new(Self {
            credentials,
            transport,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn transport(&self) -> &Arc<dyn GraphTransport> {
        &self.transport
    }

    /// Start a batch session bound to this session.
    pub fn batch(self: &Arc<Self>) -> BatchSession {
        BatchSession::new(Arc::clone(self))
    }

    /// Send one physical request signed with `credentials`.
    pub(crate) async fn submit_signed(
        &self,
        credentials: &Credentials,
        path: &str,
        mut params: RequestParams,
        verb: Verb,
        options: &TransportOptions,
    ) -> Result<RawResponse, BatchError> {
        credentials.sign(&mut params);
        Ok(self.transport.submit(path, params, verb, options).await?)
    }

    /// Perform one call immediately.
    ///
    /// API errors surface as `BatchError::Graph`; the transform only sees
    /// successful values.
    pub async fn graph_call(self: &Arc<Self>, call: GraphCall) -> Result<GraphValue, BatchError> {
        let GraphCall {
            path,
            args,
            verb,
            options,
            transform,
        } = call;

        let mut params = RequestParams::from_args(&args);
        if let Some(token) = &options.access_token {
            params.fields.insert("access_token".to_string(), token.clone());
        }

        let response = self
            .submit_signed(&self.credentials, &path, params, verb, &options.transport)
            .await?;
        if let Some(err) = check_response(response.status, &response.body, &response.headers) {
            return Err(err.into());
        }

        let body = decode_body(&response.body)?;
        let value = select_component(options.http_component, response.status, &response.headers, body);
        let value = GraphCollection::evaluate(value, self);
        match transform {
            Some(f) => Ok(f(Ok(value))?),
            None => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appsecret_proof_matches_known_vector() {
        // RFC 4231 test case 2.
        let proof = appsecret_proof("Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(
            proof,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn sign_adds_token_and_proof() {
        let creds = Credentials::new("main").with_app_secret("secret");
        let mut params = RequestParams::default();
        creds.sign(&mut params);
        assert_eq!(params.field("access_token"), Some("main"));
        assert_eq!(
            params.field("appsecret_proof").map(str::to_string),
            appsecret_proof("secret", "main")
        );
    }

    #[test]
    fn sign_keeps_call_token_and_proves_it() {
        let creds = Credentials::new("main").with_app_secret("secret");
        let mut params = RequestParams::default();
        params.fields.insert("access_token".into(), "page".into());
        creds.sign(&mut params);
        assert_eq!(params.field("access_token"), Some("page"));
        assert_eq!(
            params.field("appsecret_proof").map(str::to_string),
            appsecret_proof("secret", "page")
        );
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::new("tok").with_app_secret("shh");
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("\"tok\""));
        assert!(!dbg.contains("shh"));
    }

    #[test]
    fn builder_sets_batch_args() {
        let call = GraphCall::get("me").name("me-call").omit_response_on_success(false);
        assert_eq!(call.options.batch_args.name.as_deref(), Some("me-call"));
        assert_eq!(call.options.batch_args.omit_response_on_success, Some(false));
        assert_eq!(call.verb, Verb::Get);
    }
}
