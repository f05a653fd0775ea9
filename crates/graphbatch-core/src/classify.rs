//! Error classification shared by batched slots and non-batched responses.
//!
//! A response is an error when its status is ≥ 400, or when its body is a
//! JSON object carrying a structured `error` object.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{GraphError, GraphErrorKind};

/// Error codes that mean the access token itself is unusable.
const AUTHENTICATION_ERROR_CODES: [i64; 5] = [102, 190, 450, 452, 2500];

const DEBUG_HEADERS: [&str; 3] = ["x-fb-debug", "x-fb-rev", "x-fb-trace-id"];

/// Returns the classified error for a response, or `None` if it succeeded.
pub fn check_response(
    status: u16,
    body: &str,
    headers: &IndexMap<String, String>,
) -> Option<GraphError> {
    let parsed: Option<Value> = serde_json::from_str(body.trim()).ok();
    let error_info = parsed
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(Value::as_object);

    if status < 400 && error_info.is_none() {
        return None;
    }

    let kind = if error_info.is_some_and(is_auth_error) {
        GraphErrorKind::Authentication
    } else if status >= 500 && parsed.is_none() {
        GraphErrorKind::Server
    } else {
        GraphErrorKind::Client
    };

    let mut err = GraphError::new(kind, status, body);
    if let Some(info) = error_info {
        err.error_type = string_field(info, "type");
        err.code = int_field(info, "code");
        err.error_subcode = int_field(info, "error_subcode");
        err.message = string_field(info, "message");
        err.user_title = string_field(info, "error_user_title");
        err.user_msg = string_field(info, "error_user_msg");
        err.fbtrace_id = string_field(info, "fbtrace_id");
    }
    for (name, value) in headers {
        let lower = name.to_ascii_lowercase();
        if DEBUG_HEADERS.contains(&lower.as_str()) {
            err.debug_headers.insert(lower, value.clone());
        }
    }
    Some(err)
}

fn is_auth_error(info: &Map<String, Value>) -> bool {
    if info.get("type").and_then(Value::as_str) != Some("OAuthException") {
        return false;
    }
    match int_field(info, "code") {
        Some(code) => AUTHENTICATION_ERROR_CODES.contains(&code),
        None => true,
    }
}

fn string_field(info: &Map<String, Value>, key: &str) -> Option<String> {
    match info.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

// Codes arrive as numbers or numeric strings.
fn int_field(info: &Map<String, Value>, key: &str) -> Option<i64> {
    match info.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_headers() -> IndexMap<String, String> {
        IndexMap::new()
    }

    #[test]
    fn success_is_not_an_error() {
        assert!(check_response(200, r#"{"id":"1"}"#, &no_headers()).is_none());
        assert!(check_response(200, "", &no_headers()).is_none());
        assert!(check_response(200, "true", &no_headers()).is_none());
    }

    #[test]
    fn oauth_error_with_auth_code() {
        let body = r#"{"error":{"type":"OAuthException","code":190,"message":"Error validating access token"}}"#;
        let err = check_response(400, body, &no_headers()).unwrap();
        assert_eq!(err.kind, GraphErrorKind::Authentication);
        assert_eq!(err.code, Some(190));
        assert_eq!(err.message.as_deref(), Some("Error validating access token"));
        assert_eq!(err.response_body, body);
    }

    #[test]
    fn oauth_error_with_other_code_is_client() {
        let body = r#"{"error":{"type":"OAuthException","code":"803","message":"Some of the aliases you requested do not exist"}}"#;
        let err = check_response(404, body, &no_headers()).unwrap();
        assert_eq!(err.kind, GraphErrorKind::Client);
        assert_eq!(err.code, Some(803));
    }

    #[test]
    fn unparseable_5xx_is_server_error() {
        let err = check_response(502, "<html>Bad Gateway</html>", &no_headers()).unwrap();
        assert_eq!(err.kind, GraphErrorKind::Server);
        assert_eq!(err.http_status, 502);
    }

    #[test]
    fn structured_error_in_2xx_body() {
        let body = r#"{"error":{"type":"GraphMethodException","code":100,"error_subcode":33}}"#;
        let err = check_response(200, body, &no_headers()).unwrap();
        assert_eq!(err.kind, GraphErrorKind::Client);
        assert_eq!(err.error_subcode, Some(33));
    }

    #[test]
    fn debug_headers_are_captured() {
        let mut headers = IndexMap::new();
        headers.insert("X-FB-Trace-ID".to_string(), "Abc123".to_string());
        headers.insert("Content-Type".to_string(), "text/javascript".to_string());
        let err = check_response(500, r#"{"error":{"message":"oops"}}"#, &headers).unwrap();
        assert_eq!(err.kind, GraphErrorKind::Client);
        assert_eq!(err.debug_headers.get("x-fb-trace-id").map(String::as_str), Some("Abc123"));
        assert_eq!(err.debug_headers.len(), 1);
    }
}
