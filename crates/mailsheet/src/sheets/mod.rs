//! Google Sheets API integration
//!
//! The sync owns columns A-E of the target sheet: row 1 holds the header,
//! column E holds the message ID used for dedup.

mod client;

pub use client::SheetsClient;

/// Range holding the header row
pub const HEADER_RANGE: &str = "A1:E1";
/// Range holding every message ID (header included)
pub const ID_COLUMN_RANGE: &str = "E:E";
/// Range rows are appended to
pub const APPEND_RANGE: &str = "A:E";

/// Sheets API request/response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// A block of cell values
    #[derive(Debug, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ValueRange {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub range: Option<String>,
        /// Rows of cells; trailing empty rows and cells are omitted by the API
        #[serde(default)]
        pub values: Vec<Vec<serde_json::Value>>,
    }

    /// Response from `values:append`
    #[derive(Debug, Deserialize)]
    pub struct AppendValuesResponse {
        pub updates: Option<UpdateValuesResponse>,
    }

    /// Response from `values.update` (also nested in append responses)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UpdateValuesResponse {
        pub updated_range: Option<String>,
    }
}

/// Render a cell value as the string it displays
pub(crate) fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
