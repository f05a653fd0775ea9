//! HTTP transport backed by `reqwest`.
//!
//! Features:
//! - API version prefixing (skipped when the path already carries one)
//! - Query-string arguments for read verbs, form or multipart bodies for writes
//! - Exponential backoff for requests that never reached the API

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use graphbatch_core::error::TransportError;
use graphbatch_core::request::{RequestParams, TransportOptions, Verb};
use graphbatch_core::response::RawResponse;
use graphbatch_core::transport::GraphTransport;

use crate::retry::RetryConfig;

/// Configuration for `HttpGraphClient`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Scheme and host, e.g. `https://graph.facebook.com`.
    pub graph_server: String,
    /// Version segment prepended to every path, e.g. `v2.8`.
    pub api_version: Option<String>,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            graph_server: "https://graph.facebook.com".into(),
            api_version: None,
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

/// `GraphTransport` over HTTPS.
#[derive(Debug)]
pub struct HttpGraphClient {
    http: reqwest::Client,
    config: HttpClientConfig,
}

impl HttpGraphClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Full URL for `path`, with the API version unless the path has one.
    pub fn url_for(&self, path: &str, api_version: Option<&str>) -> String {
        let server = self.config.graph_server.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let version = api_version.or(self.config.api_version.as_deref());
        match version {
            Some(v) if !path_has_api_version(path) => format!("{server}/{v}/{path}"),
            _ => format!("{server}/{path}"),
        }
    }

    async fn send_once(
        &self,
        url: &str,
        params: &RequestParams,
        verb: Verb,
        options: &TransportOptions,
    ) -> Result<RawResponse, TransportError> {
        let mut request = match verb {
            Verb::Get => self.http.get(url).query(&params.fields),
            Verb::Delete => self.http.delete(url).query(&params.fields),
            Verb::Post => self.http.post(url),
            Verb::Put => self.http.put(url),
        };

        if !verb.args_in_url() {
            request = if params.has_files() {
                request.multipart(multipart_form(params)?)
            } else {
                request.form(&params.fields)
            };
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let timeout_ms = options
            .timeout
            .unwrap_or(self.config.request_timeout)
            .as_millis() as u64;
        let resp = request
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout_ms))?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, timeout_ms))?;

        Ok(RawResponse {
            status,
            body,
            headers,
        })
    }
}

#[async_trait]
impl GraphTransport for HttpGraphClient {
    async fn submit(
        &self,
        path: &str,
        params: RequestParams,
        verb: Verb,
        options: &TransportOptions,
    ) -> Result<RawResponse, TransportError> {
        let url = self.url_for(path, options.api_version.as_deref());

        let mut retry = 0u32;
        loop {
            match self.send_once(&url, &params, verb, options).await {
                Ok(resp) => return Ok(resp),
                Err(e) if should_retry(&e, verb) => {
                    retry += 1;
                    match self.config.retry.delay_for(retry) {
                        Some(delay) => {
                            tracing::warn!(
                                retry,
                                delay_ms = delay.as_millis(),
                                error = %e,
                                %url,
                                "retrying request"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            tracing::error!(retry, error = %e, %url, "max retries exceeded");
                            return Err(e);
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn endpoint(&self) -> &str {
        &self.config.graph_server
    }
}

// A timed-out write may already have been applied; only resend it when it
// never connected.
fn should_retry(err: &TransportError, verb: Verb) -> bool {
    err.is_retryable() && (verb.args_in_url() || !err.is_timeout())
}

fn map_reqwest_error(e: reqwest::Error, timeout_ms: u64) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout { ms: timeout_ms }
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_builder() {
        TransportError::InvalidRequest(e.to_string())
    } else {
        TransportError::Http(e.to_string())
    }
}

fn multipart_form(params: &RequestParams) -> Result<reqwest::multipart::Form, TransportError> {
    let mut form = reqwest::multipart::Form::new();
    for (name, value) in &params.fields {
        form = form.text(name.clone(), value.clone());
    }
    for (name, file) in &params.files {
        let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| TransportError::InvalidRequest(format!("bad content type for {name}: {e}")))?;
        form = form.part(name.clone(), part);
    }
    Ok(form)
}

/// `true` if the first path segment is an API version (`v2`, `v2.8`) followed by more path.
pub fn path_has_api_version(path: &str) -> bool {
    let path = path.trim_start_matches('/');
    let Some((segment, _rest)) = path.split_once('/') else {
        return false;
    };
    let Some(version) = segment.strip_prefix('v') else {
        return false;
    };
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match version.split_once('.') {
        Some((major, minor)) => is_number(major) && is_number(minor),
        None => is_number(version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(version: Option<&str>) -> HttpGraphClient {
        HttpGraphClient::new(HttpClientConfig {
            graph_server: "https://graph.example.com/".into(),
            api_version: version.map(str::to_string),
            ..HttpClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn version_detection() {
        assert!(path_has_api_version("v2.8/me"));
        assert!(path_has_api_version("/v10/me/friends"));
        assert!(!path_has_api_version("v2.8"));
        assert!(!path_has_api_version("video/1"));
        assert!(!path_has_api_version("me/v2.8"));
        assert!(!path_has_api_version("v2./me"));
    }

    #[test]
    fn urls_get_a_version_prefix_once() {
        let c = client(Some("v2.8"));
        assert_eq!(c.url_for("/me", None), "https://graph.example.com/v2.8/me");
        assert_eq!(c.url_for("v2.4/me", None), "https://graph.example.com/v2.4/me");
        assert_eq!(c.url_for("/", None), "https://graph.example.com/v2.8/");
        assert_eq!(c.url_for("me", Some("v3.0")), "https://graph.example.com/v3.0/me");
    }

    #[test]
    fn unversioned_client() {
        assert_eq!(client(None).url_for("/me", None), "https://graph.example.com/me");
    }

    #[test]
    fn timed_out_writes_are_not_resent() {
        let timeout = TransportError::Timeout { ms: 0 };
        assert!(should_retry(&timeout, Verb::Get));
        assert!(!should_retry(&timeout, Verb::Post));
        assert!(should_retry(&TransportError::Connect("refused".into()), Verb::Post));
        assert!(!should_retry(&TransportError::Http("reset".into()), Verb::Get));
    }

    #[test]
    fn config_loads_with_defaults() {
        let config: HttpClientConfig =
            serde_json::from_str(r#"{"api_version":"v2.8","retry":{"max_retries":5}}"#).unwrap();
        assert_eq!(config.api_version.as_deref(), Some("v2.8"));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.graph_server, "https://graph.facebook.com");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn connection_failures_surface_after_retries() {
        let c = HttpGraphClient::new(HttpClientConfig {
            // Port 9 (discard) on localhost is closed on test machines.
            graph_server: "http://127.0.0.1:9".into(),
            retry: RetryConfig {
                max_retries: 1,
                initial_backoff: Duration::from_millis(1),
                ..RetryConfig::default()
            },
            ..HttpClientConfig::default()
        })
        .unwrap();
        let err = c
            .submit("/me", RequestParams::default(), Verb::Get, &TransportOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "{err}");
    }
}
