//! Integration tests for the mailsheet crate
//!
//! These tests drive the complete sync against the in-memory mailbox and
//! spreadsheet.

use base64::prelude::*;
use mailsheet::{
    Header, InMemoryMailbox, InMemorySpreadsheet, MAX_CONTENT_CHARS, MessageId, NormalizedRecord,
    Payload, RawMessage, SheetRow, TRUNCATION_MARKER, sync_inbox,
};

fn encode(s: &str) -> Option<String> {
    Some(BASE64_URL_SAFE_NO_PAD.encode(s))
}

/// Helper to create a plain-text test message
fn make_message(id: &str, subject: &str, body: &str) -> RawMessage {
    RawMessage::new(
        id,
        vec![
            Header::new("From", "Test User <test@example.com>"),
            Header::new("Subject", subject),
            Header::new("Date", "Mon, 2 Jan 2023 15:04:05 +0000"),
        ],
        Payload::single("text/plain", encode(body)),
    )
}

/// Helper to create an already-stored record
fn make_record(id: &str) -> NormalizedRecord {
    NormalizedRecord {
        sender: "Earlier <earlier@example.com>".to_string(),
        subject: format!("Stored {}", id),
        date: "2022-12-31 23:59:59".to_string(),
        content: "Already synced".to_string(),
        message_id: MessageId::new(id),
    }
}

fn stored_ids(sheet: &InMemorySpreadsheet) -> Vec<String> {
    sheet
        .rows()
        .iter()
        .skip(1)
        .map(|row| row.message_id().to_string())
        .collect()
}

#[test]
fn test_full_sync_writes_header_and_rows() {
    let mailbox = InMemoryMailbox::new(vec![
        make_message("m1", "First", "Hello there"),
        make_message("m2", "Second", "General Kenobi"),
    ]);
    let sheet = InMemorySpreadsheet::new();

    let stats = sync_inbox(&mailbox, &sheet).unwrap();

    assert_eq!(stats.messages_fetched, 2);
    assert_eq!(stats.rows_appended, 2);
    assert_eq!(stats.messages_marked_read, 2);

    let rows = sheet.rows();
    assert_eq!(rows[0], SheetRow::header());
    assert_eq!(
        rows[1].clone().into_cells(),
        vec![
            "Test User <test@example.com>",
            "First",
            "2023-01-02 15:04:05",
            "Hello there",
            "m1"
        ]
    );
    assert!(mailbox.is_read(&MessageId::new("m1")));
    assert!(mailbox.is_read(&MessageId::new("m2")));
}

#[test]
fn test_existing_ids_are_not_reappended_or_marked() {
    let mailbox = InMemoryMailbox::new(vec![
        make_message("m1", "Old", "seen before"),
        make_message("m3", "New", "fresh"),
    ]);
    let sheet = InMemorySpreadsheet::with_records(&[make_record("m1"), make_record("m2")]);

    let stats = sync_inbox(&mailbox, &sheet).unwrap();

    assert_eq!(stats.duplicates_skipped, 1);
    assert_eq!(stats.rows_appended, 1);
    assert_eq!(stored_ids(&sheet), vec!["m1", "m2", "m3"]);
    assert_eq!(mailbox.mark_read_calls(), vec![vec![MessageId::new("m3")]]);
    assert!(!mailbox.is_read(&MessageId::new("m1")));
}

#[test]
fn test_idempotent_sync() {
    let mailbox = InMemoryMailbox::new(vec![make_message("m1", "Once", "only once")]);
    let sheet = InMemorySpreadsheet::new();

    sync_inbox(&mailbox, &sheet).unwrap();
    let second = sync_inbox(&mailbox, &sheet).unwrap();

    assert_eq!(second.rows_appended, 0);
    assert_eq!(stored_ids(&sheet), vec!["m1"]);
    assert_eq!(sheet.append_calls(), 1);
}

#[test]
fn test_idempotent_when_mark_read_was_lost() {
    // Rows made it into the sheet but the messages are still unread:
    // the next run must neither append nor mark them again.
    let mailbox = InMemoryMailbox::new(vec![make_message("m1", "Again", "still unread")]);
    let sheet = InMemorySpreadsheet::with_records(&[make_record("m1")]);

    let stats = sync_inbox(&mailbox, &sheet).unwrap();

    assert_eq!(stats.duplicates_skipped, 1);
    assert_eq!(sheet.append_calls(), 0);
    assert!(mailbox.mark_read_calls().is_empty());
}

#[test]
fn test_empty_inbox_makes_no_writes() {
    let mailbox = InMemoryMailbox::new(vec![]);
    let sheet = InMemorySpreadsheet::new();

    let stats = sync_inbox(&mailbox, &sheet).unwrap();

    assert_eq!(stats.messages_fetched, 0);
    assert_eq!(sheet.append_calls(), 0);
    assert!(mailbox.mark_read_calls().is_empty());
    // Header is still ensured before listing
    assert_eq!(sheet.rows(), vec![SheetRow::header()]);
}

#[test]
fn test_unnormalizable_message_is_dropped_and_left_unread() {
    let broken = RawMessage {
        id: MessageId::new("broken"),
        headers: vec![Header::new("Subject", "No body at all")],
        payload: None,
    };
    let mailbox = InMemoryMailbox::new(vec![broken, make_message("ok", "Fine", "body")]);
    let sheet = InMemorySpreadsheet::new();

    let stats = sync_inbox(&mailbox, &sheet).unwrap();

    assert_eq!(stats.messages_dropped, 1);
    assert_eq!(stored_ids(&sheet), vec!["ok"]);
    assert!(!mailbox.is_read(&MessageId::new("broken")));
    assert!(mailbox.is_read(&MessageId::new("ok")));
}

#[test]
fn test_append_failure_aborts_before_mark_read() {
    let mailbox = InMemoryMailbox::new(vec![make_message("m1", "Lost", "body")]);
    let sheet = InMemorySpreadsheet::failing_append();

    let err = sync_inbox(&mailbox, &sheet).unwrap_err();

    assert!(err.to_string().contains("appending"));
    assert!(mailbox.mark_read_calls().is_empty());
    assert!(!mailbox.is_read(&MessageId::new("m1")));
}

#[test]
fn test_listing_failure_aborts_run() {
    let mailbox = InMemoryMailbox::failing();
    let sheet = InMemorySpreadsheet::new();

    assert!(sync_inbox(&mailbox, &sheet).is_err());
    assert_eq!(sheet.append_calls(), 0);
}

#[test]
fn test_new_mail_between_runs_is_appended() {
    let mailbox = InMemoryMailbox::new(vec![make_message("m1", "First", "one")]);
    let sheet = InMemorySpreadsheet::new();

    sync_inbox(&mailbox, &sheet).unwrap();
    mailbox.deliver(make_message("m2", "Second", "two"));
    let stats = sync_inbox(&mailbox, &sheet).unwrap();

    assert_eq!(stats.messages_fetched, 1);
    assert_eq!(stored_ids(&sheet), vec!["m1", "m2"]);
}

#[test]
fn test_multipart_plain_and_html_stores_plain_text() {
    let message = RawMessage::new(
        "mp",
        vec![Header::new("Subject", "Newsletter")],
        Payload::multi(
            "multipart/alternative",
            vec![
                Payload::single("text/plain", encode("Plain body")),
                Payload::single("text/html", encode("<p>HTML body</p>")),
            ],
        ),
    );
    let mailbox = InMemoryMailbox::new(vec![message]);
    let sheet = InMemorySpreadsheet::new();

    sync_inbox(&mailbox, &sheet).unwrap();

    assert_eq!(sheet.rows()[1].0[3], "Plain body");
}

#[test]
fn test_long_body_is_truncated_in_sheet() {
    let body = "x".repeat(MAX_CONTENT_CHARS * 2);
    let mailbox = InMemoryMailbox::new(vec![make_message("long", "Long", &body)]);
    let sheet = InMemorySpreadsheet::new();

    sync_inbox(&mailbox, &sheet).unwrap();

    let content = sheet.rows()[1].0[3].clone();
    assert_eq!(
        content,
        format!("{}{}", "x".repeat(MAX_CONTENT_CHARS), TRUNCATION_MARKER)
    );
}
