//! Request-side wire types shared by batched and non-batched calls.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UnknownVerb;

/// HTTP verb of a logical call. Always rendered lowercase on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Get,
    Post,
    Delete,
    Put,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Put => "put",
        }
    }

    /// Read verbs carry their arguments in the query string, write verbs in the body.
    pub fn args_in_url(&self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = UnknownVerb;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "delete" => Ok(Self::Delete),
            "put" => Ok(Self::Put),
            _ => Err(UnknownVerb(s.to_string())),
        }
    }
}

/// Which part of the HTTP response a call wants back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpComponent {
    /// The numeric status code.
    Status,
    /// The response headers as a name → value map.
    Headers,
    /// The decoded JSON body.
    #[default]
    Body,
}

/// A binary upload attached to a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadableFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadableFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// One argument value of a call.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Text(String),
    /// Non-string JSON is sent JSON-encoded.
    Json(Value),
    File(UploadableFile),
}

impl ArgValue {
    /// The form-encoded representation, `None` for file uploads.
    pub fn to_form_value(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Json(Value::String(s)) => Some(s.clone()),
            Self::Json(v) => Some(v.to_string()),
            Self::File(_) => None,
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Value> for ArgValue {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl From<u64> for ArgValue {
    fn from(n: u64) -> Self {
        Self::Json(Value::from(n))
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        Self::Json(Value::Bool(b))
    }
}

impl From<UploadableFile> for ArgValue {
    fn from(f: UploadableFile) -> Self {
        Self::File(f)
    }
}

/// Call arguments. Sorted by key so encodings are stable.
pub type Args = BTreeMap<String, ArgValue>;

/// Form-encode a flat parameter map (`a=1&b=two+words`).
pub fn encode_params(params: &BTreeMap<String, String>) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

/// Batch-only descriptor fields a call may set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchArgs {
    /// Name other calls can reference through JSONPath expressions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omit_response_on_success: Option<bool>,
}

/// Parameters of one physical request: form fields plus uploads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    pub fields: BTreeMap<String, String>,
    pub files: IndexMap<String, UploadableFile>,
}

impl RequestParams {
    /// Split call arguments into form fields and uploads, keeping upload keys as given.
    pub fn from_args(args: &Args) -> Self {
        let mut params = Self::default();
        for (key, value) in args {
            match value {
                ArgValue::File(file) => {
                    params.files.insert(key.clone(), file.clone());
                }
                other => {
                    if let Some(v) = other.to_form_value() {
                        params.fields.insert(key.clone(), v);
                    }
                }
            }
        }
        params
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn encoded_fields(&self) -> String {
        encode_params(&self.fields)
    }
}

/// Options handed through, untouched, to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    pub timeout: Option<Duration>,
    /// Overrides the transport's configured API version for this request.
    pub api_version: Option<String>,
    pub headers: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_parsing_is_case_insensitive() {
        assert_eq!("GET".parse::<Verb>().unwrap(), Verb::Get);
        assert_eq!("Delete".parse::<Verb>().unwrap(), Verb::Delete);
        assert_eq!(Verb::Post.to_string(), "post");
        assert!("patch".parse::<Verb>().is_err());
    }

    #[test]
    fn json_args_are_encoded_as_json() {
        assert_eq!(ArgValue::from("me").to_form_value().as_deref(), Some("me"));
        assert_eq!(ArgValue::from(25u64).to_form_value().as_deref(), Some("25"));
        assert_eq!(
            ArgValue::from(serde_json::json!(["id", "name"])).to_form_value().as_deref(),
            Some(r#"["id","name"]"#)
        );
    }

    #[test]
    fn params_are_sorted_and_escaped() {
        let mut fields = BTreeMap::new();
        fields.insert("q".to_string(), "two words".to_string());
        fields.insert("fields".to_string(), "id,name".to_string());
        assert_eq!(encode_params(&fields), "fields=id%2Cname&q=two+words");
    }

    #[test]
    fn from_args_separates_uploads() {
        let mut args = Args::new();
        args.insert("message".into(), "hi".into());
        args.insert("source".into(), UploadableFile::new("a.png", "image/png", vec![1u8, 2]).into());
        let params = RequestParams::from_args(&args);
        assert_eq!(params.field("message"), Some("hi"));
        assert!(params.files.contains_key("source"));
        assert!(!params.fields.contains_key("source"));
    }
}
