//! Trait definitions for the two sides of a sync

use anyhow::Result;
use std::collections::HashSet;

use crate::models::{MessageId, NormalizedRecord, RawMessage};

/// Source of unread mail
///
/// Implemented by [`GmailClient`](crate::gmail::GmailClient) and, for tests,
/// [`InMemoryMailbox`](super::InMemoryMailbox).
pub trait Mailbox {
    /// Make sure the mailbox can be called (may prompt for consent)
    fn authenticate(&self) -> Result<()>;

    /// Fetch the unread inbox messages, in provider order
    fn list_unread(&self) -> Result<Vec<RawMessage>>;

    /// Clear the unread state of every given message; the first failure aborts
    fn mark_read(&self, ids: &[MessageId]) -> Result<()>;
}

/// Destination spreadsheet
///
/// Implemented by [`SheetsClient`](crate::sheets::SheetsClient) and, for tests,
/// [`InMemorySpreadsheet`](super::InMemorySpreadsheet).
pub trait Spreadsheet {
    /// Make sure the spreadsheet can be called (may prompt for consent)
    fn authenticate(&self) -> Result<()>;

    /// Write the header row if the sheet has none (idempotent)
    fn ensure_headers(&self) -> Result<()>;

    /// IDs of every message already stored as a row
    fn existing_ids(&self) -> Result<HashSet<MessageId>>;

    /// Append one row per record in a single call; no call for an empty slice
    fn append(&self, records: &[NormalizedRecord]) -> Result<()>;
}
