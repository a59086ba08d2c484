//! Gmail API response conversion
//!
//! Turns the loosely-shaped API payload ("has parts, or has a body") into the
//! [`Payload`] tagged union.

use super::api::{GmailMessage, MessagePart};
use crate::models::{Header, MessageId, Payload, RawMessage};

/// Convert a Gmail API message into a [`RawMessage`]
pub fn to_raw_message(gmail_msg: GmailMessage) -> RawMessage {
    let headers = gmail_msg
        .payload
        .as_ref()
        .and_then(|p| p.headers.as_ref())
        .map(|headers| {
            headers
                .iter()
                .map(|h| Header::new(&h.name, &h.value))
                .collect()
        })
        .unwrap_or_default();

    RawMessage {
        id: MessageId::new(gmail_msg.id),
        headers,
        payload: gmail_msg.payload.map(to_payload),
    }
}

/// A part with child parts is a container, anything else is a leaf
fn to_payload(part: MessagePart) -> Payload {
    let mime_type = part.mime_type.unwrap_or_default();

    match part.parts {
        Some(parts) => Payload::MultiPart {
            mime_type,
            parts: parts.into_iter().map(to_payload).collect(),
        },
        None => Payload::SinglePart {
            mime_type,
            data: part.body.and_then(|b| b.data),
        },
    }
}
