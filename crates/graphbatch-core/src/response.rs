//! Response-side wire types and body decoding.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection::GraphValue;
use crate::request::HttpComponent;

/// What a transport hands back for one physical request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    pub headers: IndexMap<String, String>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: IndexMap::new(),
        }
    }
}

/// A header pair as the batch endpoint encodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// One non-null element of a composite response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotResponse {
    pub code: u16,
    /// The call's own response body, itself JSON-encoded.
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub headers: Vec<Header>,
}

impl SlotResponse {
    pub fn header_map(&self) -> IndexMap<String, String> {
        self.headers
            .iter()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect()
    }

    pub fn body_str(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

/// Decode a response body; an empty body decodes to `null`.
///
/// Scalar bodies (`true`, `"ok"`, `42`) are valid.
pub fn decode_body(body: &str) -> Result<Value, serde_json::Error> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(trimmed)
}

/// Pick the part of a successful response the caller asked for.
pub fn select_component(
    component: HttpComponent,
    status: u16,
    headers: &IndexMap<String, String>,
    body: Value,
) -> GraphValue {
    match component {
        HttpComponent::Status => GraphValue::Status(status),
        HttpComponent::Headers => GraphValue::Headers(headers.clone()),
        HttpComponent::Body => GraphValue::Json(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_scalar_bodies() {
        assert_eq!(decode_body("").unwrap(), Value::Null);
        assert_eq!(decode_body("  true ").unwrap(), Value::Bool(true));
        assert_eq!(decode_body("\"ok\"").unwrap(), Value::String("ok".into()));
        assert!(decode_body("{not json").is_err());
    }

    #[test]
    fn slot_headers_become_a_map() {
        let slot: SlotResponse = serde_json::from_str(
            r#"{"code":200,"body":"{}","headers":[{"name":"ETag","value":"\"abc\""},{"name":"Content-Type","value":"text/javascript"}]}"#,
        )
        .unwrap();
        let headers = slot.header_map();
        assert_eq!(headers.get("ETag").map(String::as_str), Some("\"abc\""));
        assert_eq!(headers.get_index(1).map(|(k, _)| k.as_str()), Some("Content-Type"));
    }

    #[test]
    fn slot_without_body_or_headers() {
        let slot: SlotResponse = serde_json::from_str(r#"{"code":204}"#).unwrap();
        assert_eq!(slot.body_str(), "");
        assert!(slot.headers.is_empty());
    }
}
