//! Mailsheet - copy unread Gmail messages into a Google Sheet
//!
//! This crate provides:
//! - Body extraction and message normalization (sender, subject, date, content)
//! - Shared Google OAuth authentication with a local token cache
//! - Gmail and Sheets API clients
//! - An idempotent sync that appends new messages and marks them read
//!
//! The sync talks to both services through the [`Mailbox`] and
//! [`Spreadsheet`] traits; in-memory implementations back the tests.

pub mod auth;
pub mod config;
pub mod extract;
pub mod gmail;
pub mod models;
pub mod normalize;
pub mod sheets;
pub mod sync;

pub use auth::{GoogleAuth, SYNC_SCOPES};
pub use crate::config::{AppConfig, ConfigError, ConfigFile, GoogleCredentials, parse_spreadsheet_id};
pub use extract::{MAX_CONTENT_CHARS, TRUNCATION_MARKER, extract_body};
pub use gmail::GmailClient;
pub use models::{Header, MessageId, NormalizedRecord, Payload, RawMessage, SheetRow};
pub use normalize::{SkipReason, format_date, normalize_message};
pub use sheets::SheetsClient;
pub use sync::{
    InMemoryMailbox, InMemorySpreadsheet, Mailbox, Spreadsheet, SyncStats, sync_inbox,
};
