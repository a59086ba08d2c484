//! Sync engine copying unread mail into the spreadsheet
//!
//! Provides an idempotent sync that can be safely re-run.

mod inbox;
mod memory;
mod traits;

pub use inbox::{SyncStats, sync_inbox};
pub use memory::{InMemoryMailbox, InMemorySpreadsheet};
pub use traits::{Mailbox, Spreadsheet};
