//! Raw message model as fetched from the mailbox

use serde::{Deserialize, Serialize};

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Email header (name-value pair)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// MIME body tree of a message
///
/// A leaf carries its MIME type and the base64url-encoded content (if any);
/// a container carries its ordered child parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    SinglePart {
        mime_type: String,
        data: Option<String>,
    },
    MultiPart {
        mime_type: String,
        parts: Vec<Payload>,
    },
}

impl Payload {
    /// Create a leaf part
    pub fn single(mime_type: impl Into<String>, data: Option<String>) -> Self {
        Self::SinglePart {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Create a container part
    pub fn multi(mime_type: impl Into<String>, parts: Vec<Payload>) -> Self {
        Self::MultiPart {
            mime_type: mime_type.into(),
            parts,
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            Self::SinglePart { mime_type, .. } | Self::MultiPart { mime_type, .. } => mime_type,
        }
    }

    /// Check whether this part's MIME essence matches `expected` (case-insensitive, parameters ignored)
    pub fn is_mime(&self, expected: &str) -> bool {
        self.mime_type()
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(expected))
    }
}

/// A message as fetched from the provider, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub id: MessageId,
    pub headers: Vec<Header>,
    /// Body tree; `None` when the provider returned no payload
    pub payload: Option<Payload>,
}

impl RawMessage {
    pub fn new(id: impl Into<MessageId>, headers: Vec<Header>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            headers,
            payload: Some(payload),
        }
    }

    /// Look up a header value by name (case-insensitive), empty if absent
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_with_headers(headers: Vec<(&str, &str)>) -> RawMessage {
        RawMessage::new(
            "m1",
            headers.into_iter().map(|(n, v)| Header::new(n, v)).collect(),
            Payload::single("text/plain", None),
        )
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        for name in ["subject", "Subject", "SUBJECT"] {
            let msg = message_with_headers(vec![(name, "Quarterly report")]);
            assert_eq!(msg.header("Subject"), "Quarterly report");
            assert_eq!(msg.header("subject"), "Quarterly report");
            assert_eq!(msg.header("SUBJECT"), "Quarterly report");
        }
    }

    #[test]
    fn test_header_missing_is_empty() {
        let msg = message_with_headers(vec![("From", "alice@example.com")]);
        assert_eq!(msg.header("Date"), "");
    }

    #[test]
    fn test_header_first_match_wins() {
        let msg = message_with_headers(vec![("Received", "first"), ("received", "second")]);
        assert_eq!(msg.header("Received"), "first");
    }

    #[test]
    fn test_is_mime_ignores_parameters_and_case() {
        let part = Payload::single("Text/HTML; charset=\"utf-8\"", None);
        assert!(part.is_mime("text/html"));
        assert!(!part.is_mime("text/plain"));
    }
}
