//! Turn a slice of queued calls into the parameters of one batch request.

use crate::api::Credentials;
use crate::batch::operation::{BatchDescriptor, QueuedCall};
use crate::error::BatchError;
use crate::request::RequestParams;

/// Maximum number of calls the API accepts in one batch request.
pub const MAX_CALLS: usize = 50;

/// Build the outer request for `calls` (at most [`MAX_CALLS`]).
///
/// The `batch` field holds the JSON array of descriptors; uploads of every
/// call are merged into the outer parameters under their unique keys.
pub fn build_chunk(calls: &[QueuedCall], credentials: &Credentials) -> Result<RequestParams, BatchError> {
    debug_assert!(calls.len() <= MAX_CALLS, "chunk of {} calls", calls.len());

    let batch_token = credentials.access_token.as_deref();
    let app_secret = credentials.app_secret.as_deref();

    let mut params = RequestParams::default();
    let mut descriptors: Vec<BatchDescriptor> = Vec::with_capacity(calls.len());
    for call in calls {
        for (key, file) in call.files() {
            let previous = params.files.insert(key.clone(), file.clone());
            debug_assert!(previous.is_none(), "attachment key {key} reused");
        }
        descriptors.push(call.to_descriptor(batch_token, app_secret));
    }

    params
        .fields
        .insert("batch".to_string(), serde_json::to_string(&descriptors)?);
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GraphCall;
    use crate::request::UploadableFile;

    fn decode(params: &RequestParams) -> Vec<BatchDescriptor> {
        serde_json::from_str(params.field("batch").unwrap()).unwrap()
    }

    #[test]
    fn one_descriptor_per_call_in_order() {
        let creds = Credentials::new("main");
        let calls: Vec<QueuedCall> = ["a", "b", "c"]
            .iter()
            .map(|p| QueuedCall::new(GraphCall::get(*p), Some("main")))
            .collect();
        let params = build_chunk(&calls, &creds).unwrap();
        let urls: Vec<String> = decode(&params).into_iter().map(|d| d.relative_url).collect();
        assert_eq!(urls, vec!["a", "b", "c"]);
        assert!(params.files.is_empty());
    }

    #[test]
    fn attachments_from_two_calls_are_merged() {
        let creds = Credentials::new("main");
        let photo = |name: &str| UploadableFile::new(name, "image/png", name.as_bytes().to_vec());
        let calls = vec![
            QueuedCall::new(GraphCall::post("me/photos").arg("source", photo("one.png")), Some("main")),
            QueuedCall::new(GraphCall::post("me/photos").arg("source", photo("two.png")), Some("main")),
        ];
        let params = build_chunk(&calls, &creds).unwrap();

        assert_eq!(params.files.len(), 2);
        let names: Vec<&str> = params.files.values().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["one.png", "two.png"]);

        let descriptors = decode(&params);
        for (call, descriptor) in calls.iter().zip(&descriptors) {
            let key = call.files().keys().next().unwrap();
            assert_eq!(descriptor.attached_files.as_deref(), Some(key.as_str()));
            assert!(params.files.contains_key(key));
        }
    }
}
