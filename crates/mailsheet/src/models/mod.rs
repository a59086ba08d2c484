//! Domain models for messages and spreadsheet rows

mod message;
mod record;

pub use message::{Header, MessageId, Payload, RawMessage};
pub use record::{HEADER_ROW, NormalizedRecord, SheetRow};
