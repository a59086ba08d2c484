//! Normalized record and its spreadsheet row form

use serde::{Deserialize, Serialize};

use super::MessageId;

/// Header row written to A1:E1 of an empty sheet
pub const HEADER_ROW: [&str; 5] = ["From", "Subject", "Date", "Content", "Email ID"];

/// A message reduced to the fields stored in the spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Raw `From` header
    pub sender: String,
    pub subject: String,
    /// `YYYY-MM-DD HH:MM:SS`, or the raw `Date` header if it couldn't be parsed
    pub date: String,
    /// Plain-text body, length-capped
    pub content: String,
    pub message_id: MessageId,
}

impl NormalizedRecord {
    /// Convert to the ordered row written to columns A-E
    pub fn to_row(&self) -> SheetRow {
        SheetRow([
            self.sender.clone(),
            self.subject.clone(),
            self.date.clone(),
            self.content.clone(),
            self.message_id.as_str().to_string(),
        ])
    }
}

/// Ordered (sender, subject, date, content, message_id) row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetRow(pub [String; 5]);

impl SheetRow {
    /// The header row as a SheetRow
    pub fn header() -> Self {
        Self(HEADER_ROW.map(str::to_string))
    }

    /// Message ID cell (column E)
    pub fn message_id(&self) -> &str {
        &self.0[4]
    }

    pub fn into_cells(self) -> Vec<String> {
        self.0.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_row_column_order() {
        let record = NormalizedRecord {
            sender: "Alice <alice@example.com>".to_string(),
            subject: "Hello".to_string(),
            date: "2023-01-02 15:04:05".to_string(),
            content: "Body".to_string(),
            message_id: MessageId::new("m1"),
        };

        let row = record.to_row();
        assert_eq!(
            row.into_cells(),
            vec!["Alice <alice@example.com>", "Hello", "2023-01-02 15:04:05", "Body", "m1"]
        );
    }

    #[test]
    fn test_empty_fields_stay_empty_cells() {
        let record = NormalizedRecord {
            sender: String::new(),
            subject: String::new(),
            date: String::new(),
            content: String::new(),
            message_id: MessageId::new("m2"),
        };
        let row = record.to_row();
        assert_eq!(row.0[..4], ["", "", "", ""]);
        assert_eq!(row.message_id(), "m2");
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let json = serde_json::to_string(&SheetRow::header()).unwrap();
        assert_eq!(json, r#"["From","Subject","Date","Content","Email ID"]"#);
    }
}
