//! Message classification for incoming JSON-RPC frames.
//!
//! Both ends of the tool channel call [`classify_message`] once per decoded
//! frame: the endpoint dispatches `Request`s, the client correlates
//! `Response`s with its pending table.

use serde_json::Value;

#[derive(Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// A request that expects a response (`id` + `method`).
    Request { id: u64, method: String },
    /// A response to a request we sent (`id`, no `method`).
    Response { id: u64 },
    /// A message with `method` but no `id`. Never answered.
    Notification { method: String },
    /// A request whose `id` is present but not a non-negative integer.
    /// Answered with an invalid-request error echoing the raw id.
    UnsupportedId { id: Value, method: String },
    /// Anything else: not an object, or neither `id` nor `method`.
    Invalid,
}

pub fn classify_message(json: &Value) -> MessageKind {
    let raw_id = json.get("id");
    let id = raw_id.and_then(|v| v.as_u64());
    let method = json.get("method").and_then(|v| v.as_str());

    if let (Some(raw), None, Some(method)) = (raw_id, id, method) {
        return MessageKind::UnsupportedId {
            id: raw.clone(),
            method: method.to_string(),
        };
    }

    match (id, method) {
        (Some(id), Some(method)) => MessageKind::Request {
            id,
            method: method.to_string(),
        },
        (Some(id), None) => MessageKind::Response { id },
        (None, Some(method)) => MessageKind::Notification {
            method: method.to_string(),
        },
        (None, None) => MessageKind::Invalid,
    }
}
