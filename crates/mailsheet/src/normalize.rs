//! Message normalization
//!
//! Converts a [`RawMessage`] into the [`NormalizedRecord`] stored in the sheet.
//! Per-message problems are reported as a [`SkipReason`] instead of failing
//! the batch.

use chrono::DateTime;

use crate::extract::extract_body;
use crate::models::{NormalizedRecord, RawMessage};

/// Output format for the `Date` column
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Why a message was left out of the sync
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("message has no ID")]
    MissingId,
    #[error("message {0} has no payload")]
    MissingPayload(String),
}

/// Normalize a fetched message into a sheet record
pub fn normalize_message(message: &RawMessage) -> Result<NormalizedRecord, SkipReason> {
    if message.id.as_str().trim().is_empty() {
        return Err(SkipReason::MissingId);
    }

    let payload = message
        .payload
        .as_ref()
        .ok_or_else(|| SkipReason::MissingPayload(message.id.to_string()))?;

    Ok(NormalizedRecord {
        sender: message.header("From").to_string(),
        subject: message.header("Subject").to_string(),
        date: format_date(message.header("Date")),
        content: extract_body(payload),
        message_id: message.id.clone(),
    })
}

/// Format an RFC 2822 date header as `YYYY-MM-DD HH:MM:SS`
///
/// The timestamp keeps its own offset. Unparseable input is returned unchanged.
pub fn format_date(raw: &str) -> String {
    parse_rfc2822(raw)
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn parse_rfc2822(raw: &str) -> Option<DateTime<chrono::FixedOffset>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt);
    }

    // Many mailers append a zone comment, e.g. "... +0000 (UTC)"
    let without_comment = match trimmed.rfind('(') {
        Some(idx) if trimmed.ends_with(')') => trimmed[..idx].trim_end(),
        _ => trimmed,
    };
    if let Ok(dt) = DateTime::parse_from_rfc2822(without_comment) {
        return Some(dt);
    }

    // chrono rejects a weekday that disagrees with the date; the weekday is optional
    let (_, without_weekday) = without_comment.split_once(',')?;
    DateTime::parse_from_rfc2822(without_weekday.trim_start()).ok()
}
