//! In-memory mailbox and spreadsheet
//!
//! Stand-ins for the Gmail and Sheets clients, used to exercise the sync
//! without network access. They record every mutating call so tests can
//! assert on what was (or wasn't) sent.

use anyhow::{Result, bail};
use std::collections::HashSet;
use std::sync::RwLock;

use super::{Mailbox, Spreadsheet};
use crate::models::{MessageId, NormalizedRecord, RawMessage, SheetRow};

/// In-memory implementation of [`Mailbox`]
///
/// Messages stay "unread" until `mark_read` is called for their ID.
#[derive(Default)]
pub struct InMemoryMailbox {
    messages: RwLock<Vec<RawMessage>>,
    read: RwLock<HashSet<MessageId>>,
    mark_read_calls: RwLock<Vec<Vec<MessageId>>>,
    fail_listing: bool,
}

impl InMemoryMailbox {
    /// Create a mailbox holding the given unread messages
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self {
            messages: RwLock::new(messages),
            ..Default::default()
        }
    }

    /// Create a mailbox whose listing always fails
    pub fn failing() -> Self {
        Self {
            fail_listing: true,
            ..Default::default()
        }
    }

    /// Deliver another unread message
    pub fn deliver(&self, message: RawMessage) {
        self.messages.write().unwrap().push(message);
    }

    /// Whether a message has been marked read
    pub fn is_read(&self, id: &MessageId) -> bool {
        self.read.read().unwrap().contains(id)
    }

    /// Every `mark_read` call received, in order
    pub fn mark_read_calls(&self) -> Vec<Vec<MessageId>> {
        self.mark_read_calls.read().unwrap().clone()
    }
}

impl Mailbox for InMemoryMailbox {
    fn authenticate(&self) -> Result<()> {
        Ok(())
    }

    fn list_unread(&self) -> Result<Vec<RawMessage>> {
        if self.fail_listing {
            bail!("Error fetching emails: mailbox unavailable");
        }

        let read = self.read.read().unwrap();
        Ok(self
            .messages
            .read()
            .unwrap()
            .iter()
            .filter(|m| !read.contains(&m.id))
            .cloned()
            .collect())
    }

    fn mark_read(&self, ids: &[MessageId]) -> Result<()> {
        self.mark_read_calls.write().unwrap().push(ids.to_vec());
        self.read.write().unwrap().extend(ids.iter().cloned());
        Ok(())
    }
}

/// In-memory implementation of [`Spreadsheet`]
///
/// Row 0 is the header once `ensure_headers` has run.
#[derive(Default)]
pub struct InMemorySpreadsheet {
    rows: RwLock<Vec<SheetRow>>,
    append_calls: RwLock<usize>,
    fail_append: bool,
}

impl InMemorySpreadsheet {
    /// Create an empty sheet (no header row)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sheet with a header and one row per given record
    pub fn with_records(records: &[NormalizedRecord]) -> Self {
        let mut rows = vec![SheetRow::header()];
        rows.extend(records.iter().map(NormalizedRecord::to_row));
        Self {
            rows: RwLock::new(rows),
            ..Default::default()
        }
    }

    /// Create a sheet whose appends always fail
    pub fn failing_append() -> Self {
        Self {
            fail_append: true,
            ..Default::default()
        }
    }

    /// All rows, header included
    pub fn rows(&self) -> Vec<SheetRow> {
        self.rows.read().unwrap().clone()
    }

    /// Number of `append` calls that reached the sheet
    pub fn append_calls(&self) -> usize {
        *self.append_calls.read().unwrap()
    }
}

impl Spreadsheet for InMemorySpreadsheet {
    fn authenticate(&self) -> Result<()> {
        Ok(())
    }

    fn ensure_headers(&self) -> Result<()> {
        let mut rows = self.rows.write().unwrap();
        if rows.is_empty() {
            rows.push(SheetRow::header());
        }
        Ok(())
    }

    fn existing_ids(&self) -> Result<HashSet<MessageId>> {
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .skip(1)
            .map(SheetRow::message_id)
            .filter(|id| !id.is_empty())
            .map(MessageId::from)
            .collect())
    }

    fn append(&self, records: &[NormalizedRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        if self.fail_append {
            bail!("Error appending emails to sheet: quota exceeded");
        }

        *self.append_calls.write().unwrap() += 1;
        self.rows
            .write()
            .unwrap()
            .extend(records.iter().map(NormalizedRecord::to_row));
        Ok(())
    }
}
