//! Unread inbox → spreadsheet sync

use anyhow::Result;
use log::{error, info, warn};
use std::collections::HashSet;

use super::{Mailbox, Spreadsheet};
use crate::models::{MessageId, NormalizedRecord, RawMessage};
use crate::normalize::{SkipReason, normalize_message};

/// Statistics from a sync operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    /// Number of unread messages fetched from the mailbox
    pub messages_fetched: usize,
    /// Number of messages skipped because their ID is already in the sheet
    pub duplicates_skipped: usize,
    /// Number of messages dropped because they couldn't be normalized
    pub messages_dropped: usize,
    /// Number of rows appended to the sheet
    pub rows_appended: usize,
    /// Number of messages marked read
    pub messages_marked_read: usize,
    /// Duration of the sync operation
    pub duration_ms: u64,
}

/// Outcome of filtering and normalizing one fetched batch
#[derive(Debug, Default)]
struct Batch {
    records: Vec<NormalizedRecord>,
    duplicates: usize,
    skipped: Vec<(MessageId, SkipReason)>,
}

/// Copy unread messages into the spreadsheet, then mark them read
///
/// This operation is idempotent: messages whose ID is already in the sheet
/// are neither appended again nor marked read. Messages are marked read only
/// after their rows were appended. Any mailbox or spreadsheet error aborts
/// the run; it is logged with its full cause chain and returned.
pub fn sync_inbox(mailbox: &dyn Mailbox, sheet: &dyn Spreadsheet) -> Result<SyncStats> {
    let result = run(mailbox, sheet);
    if let Err(e) = &result {
        error!("Error in sync: {:?}", e);
    }
    result
}

fn run(mailbox: &dyn Mailbox, sheet: &dyn Spreadsheet) -> Result<SyncStats> {
    let start = std::time::Instant::now();
    let mut stats = SyncStats::default();

    info!("=== Starting Gmail to Sheets sync ===");

    // 1-2. Authenticate both sides and make sure the sheet has a header
    info!("Initializing Gmail client...");
    mailbox.authenticate()?;
    info!("Initializing Sheets client...");
    sheet.authenticate()?;
    sheet.ensure_headers()?;

    // 3. Fetch unread messages
    info!("Fetching unread emails...");
    let messages = mailbox.list_unread()?;
    stats.messages_fetched = messages.len();

    if messages.is_empty() {
        info!("No unread emails found.");
        stats.duration_ms = start.elapsed().as_millis() as u64;
        return Ok(stats);
    }
    info!("Found {} unread email(s)", messages.len());

    // 4-5. Drop what the sheet already has, normalize the rest
    info!("Checking for existing emails in sheet...");
    let existing = sheet.existing_ids()?;
    let batch = prepare_batch(messages, &existing);

    stats.duplicates_skipped = batch.duplicates;
    stats.messages_dropped = batch.skipped.len();
    for (id, reason) in &batch.skipped {
        warn!("Skipping email {}: {}", id, reason);
    }

    // 6. Nothing new
    if batch.records.is_empty() {
        info!("No new emails to process (all are duplicates or unreadable)");
        stats.duration_ms = start.elapsed().as_millis() as u64;
        return Ok(stats);
    }

    // 7. Append as one batch
    info!("Appending {} new email(s) to sheet...", batch.records.len());
    sheet.append(&batch.records)?;
    stats.rows_appended = batch.records.len();

    // 8. Mark read only what was appended
    info!("Marking emails as read...");
    let ids: Vec<MessageId> = batch
        .records
        .iter()
        .map(|r| r.message_id.clone())
        .collect();
    mailbox.mark_read(&ids)?;
    stats.messages_marked_read = ids.len();

    // 9. Done
    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "=== Successfully processed {} email(s) in {} ms ===",
        stats.rows_appended, stats.duration_ms
    );
    Ok(stats)
}

/// Filter out already-stored messages and normalize the rest
///
/// An ID seen twice in the same batch is treated as a duplicate the second time.
fn prepare_batch(messages: Vec<RawMessage>, existing: &HashSet<MessageId>) -> Batch {
    let mut batch = Batch::default();
    let mut seen: HashSet<MessageId> = HashSet::new();

    for message in messages {
        if existing.contains(&message.id) || !seen.insert(message.id.clone()) {
            info!("Skipping duplicate email ID: {}", message.id);
            batch.duplicates += 1;
            continue;
        }

        match normalize_message(&message) {
            Ok(record) => batch.records.push(record),
            Err(reason) => batch.skipped.push((message.id, reason)),
        }
    }

    batch
}
