//! Map a composite response back onto the calls of its chunk.

use std::sync::Arc;

use tracing::warn;

use crate::api::{CallOutcome, GraphApi};
use crate::batch::operation::QueuedCall;
use crate::classify::check_response;
use crate::collection::GraphCollection;
use crate::error::{BatchError, GraphError};
use crate::response::{decode_body, select_component, RawResponse, SlotResponse};

/// What one slot of a composite response means for its call.
#[derive(Debug)]
pub enum SlotOutcome {
    /// The call resolved (pre-transform).
    Resolved(CallOutcome),
    /// The API sent `null` for this slot.
    Missing,
}

/// Validate the outer response and split it into slots.
///
/// A failed outer request or an absent/empty/`null` body aborts the batch.
/// So does a slot that breaks the slot protocol (no `code`, a non-string
/// header value): the array can no longer be trusted to line up with the
/// chunk, and that surfaces as [`BatchError::Serialization`].
pub fn parse_composite(response: &RawResponse) -> Result<Vec<Option<SlotResponse>>, BatchError> {
    if let Some(err) = check_response(response.status, &response.body, &response.headers) {
        return Err(err.into());
    }

    let body = response.body.trim();
    let slots: Option<Vec<Option<SlotResponse>>> = if body.is_empty() {
        None
    } else {
        serde_json::from_str(body)?
    };

    slots.ok_or_else(|| BatchError::BadResponse {
        status: response.status,
        body: response.body.clone(),
        message: "service returned an empty body".to_string(),
    })
}

/// Classify one slot for `call`; successes are evaluated against `origin`.
pub fn demux_slot(slot: Option<&SlotResponse>, call: &QueuedCall, origin: &Arc<GraphApi>) -> SlotOutcome {
    let Some(slot) = slot else {
        return SlotOutcome::Missing;
    };

    let headers = slot.header_map();
    let body = slot.body_str();
    if let Some(err) = check_response(slot.code, body, &headers) {
        return SlotOutcome::Resolved(Err(err));
    }

    let decoded = match decode_body(body) {
        Ok(v) => v,
        Err(e) => {
            warn!(call = %call, error = %e, "undecodable body in batch slot");
            let err = GraphError::client(slot.code, body, format!("undecodable response body: {e}"));
            return SlotOutcome::Resolved(Err(err));
        }
    };

    let value = select_component(call.http_component(), slot.code, &headers, decoded);
    SlotOutcome::Resolved(Ok(GraphCollection::evaluate(value, origin)))
}
