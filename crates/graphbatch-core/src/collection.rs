//! Call result values and paginated collections.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use url::Url;

use crate::api::{GraphApi, GraphCall};
use crate::error::BatchError;

/// The successful result of one call.
#[derive(Debug, Clone)]
pub enum GraphValue {
    /// Decoded JSON body.
    Json(Value),
    /// Status code, when the call asked for `HttpComponent::Status`.
    Status(u16),
    /// Response headers, when the call asked for `HttpComponent::Headers`.
    Headers(IndexMap<String, String>),
    /// A page of a paginated connection.
    Collection(GraphCollection),
}

impl GraphValue {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<u16> {
        match self {
            Self::Status(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_headers(&self) -> Option<&IndexMap<String, String>> {
        match self {
            Self::Headers(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&GraphCollection> {
        match self {
            Self::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// The JSON the API returned; collections yield their full raw response.
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(v) => v,
            Self::Status(s) => Value::from(s),
            Self::Headers(h) => h.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
            Self::Collection(c) => c.raw_response,
        }
    }
}

/// Path and query parameters of a page link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub path: String,
    pub params: BTreeMap<String, String>,
}

impl PageRequest {
    /// Parse a paging URL; repeated query keys are joined with commas.
    pub fn parse(link: &str) -> Option<Self> {
        let url = Url::parse(link).ok()?;
        let path = url.path().trim_start_matches('/').to_string();
        let mut params: BTreeMap<String, String> = BTreeMap::new();
        for (key, value) in url.query_pairs() {
            params
                .entry(key.into_owned())
                .and_modify(|existing| {
                    existing.push(',');
                    existing.push_str(&value);
                })
                .or_insert_with(|| value.to_string());
        }
        Some(Self { path, params })
    }
}

/// One page of a paginated connection (`{"data": [...], "paging": {...}}`).
///
/// Bound to the session that originated the call, never to a batch session,
/// so page fetches are ordinary non-batched calls.
#[derive(Clone)]
pub struct GraphCollection {
    data: Vec<Value>,
    paging: Option<Value>,
    summary: Option<Value>,
    raw_response: Value,
    api: Arc<GraphApi>,
}

impl fmt::Debug for GraphCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphCollection")
            .field("data", &self.data)
            .field("paging", &self.paging)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl GraphCollection {
    /// Wrap paged shapes into a collection; anything else passes through.
    pub fn evaluate(value: GraphValue, api: &Arc<GraphApi>) -> GraphValue {
        match value {
            GraphValue::Json(json) if is_paged(&json) => {
                GraphValue::Collection(Self::from_response(json, Arc::clone(api)))
            }
            other => other,
        }
    }

    fn from_response(raw_response: Value, api: Arc<GraphApi>) -> Self {
        let data = raw_response
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let paging = raw_response.get("paging").cloned();
        let summary = raw_response.get("summary").cloned();
        Self {
            data,
            paging,
            summary,
            raw_response,
            api,
        }
    }

    pub fn data(&self) -> &[Value] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn paging(&self) -> Option<&Value> {
        self.paging.as_ref()
    }

    pub fn summary(&self) -> Option<&Value> {
        self.summary.as_ref()
    }

    pub fn raw_response(&self) -> &Value {
        &self.raw_response
    }

    /// The session page fetches go through.
    pub fn api(&self) -> &Arc<GraphApi> {
        &self.api
    }

    pub fn next_page_params(&self) -> Option<PageRequest> {
        self.page_link("next").and_then(PageRequest::parse)
    }

    pub fn previous_page_params(&self) -> Option<PageRequest> {
        self.page_link("previous").and_then(PageRequest::parse)
    }

    /// Fetch the next page, `Ok(None)` on the last page. A link that answers
    /// with anything but a paged collection is a [`BatchError::BadResponse`].
    pub async fn next_page(&self) -> Result<Option<GraphCollection>, BatchError> {
        match self.next_page_params() {
            Some(page) => self.fetch(page).await,
            None => Ok(None),
        }
    }

    pub async fn previous_page(&self) -> Result<Option<GraphCollection>, BatchError> {
        match self.previous_page_params() {
            Some(page) => self.fetch(page).await,
            None => Ok(None),
        }
    }

    fn page_link(&self, direction: &str) -> Option<&str> {
        self.paging.as_ref()?.get(direction)?.as_str()
    }

    async fn fetch(&self, page: PageRequest) -> Result<Option<GraphCollection>, BatchError> {
        let mut call = GraphCall::get(page.path);
        for (key, value) in page.params {
            call = call.arg(key, value);
        }
        match self.api.graph_call(call).await? {
            GraphValue::Collection(c) => Ok(Some(c)),
            other => Err(BatchError::BadResponse {
                status: 200,
                body: other.into_json().to_string(),
                message: "page link did not return a paged collection".to_string(),
            }),
        }
    }
}

fn is_paged(json: &Value) -> bool {
    json.get("data").is_some_and(Value::is_array)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_parsing() {
        let page = PageRequest::parse(
            "https://graph.example.com/v2.8/me/friends?limit=25&after=QVFI&fields=id&fields=name",
        )
        .unwrap();
        assert_eq!(page.path, "v2.8/me/friends");
        assert_eq!(page.params.get("limit").map(String::as_str), Some("25"));
        assert_eq!(page.params.get("after").map(String::as_str), Some("QVFI"));
        assert_eq!(page.params.get("fields").map(String::as_str), Some("id,name"));
    }

    #[test]
    fn relative_links_do_not_parse() {
        assert!(PageRequest::parse("/me/friends?after=x").is_none());
    }

    #[test]
    fn into_json_of_headers() {
        let mut headers = IndexMap::new();
        headers.insert("etag".to_string(), "abc".to_string());
        let json = GraphValue::Headers(headers).into_json();
        assert_eq!(json, serde_json::json!({"etag": "abc"}));
        assert_eq!(GraphValue::Status(201).into_json(), serde_json::json!(201));
    }
}
