//! Google Sheets API HTTP client
//!
//! Reads and writes A1-notation ranges of one spreadsheet.
//! Uses synchronous HTTP (ureq), like the Gmail client.

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashSet;
use std::sync::Arc;

use super::api::{AppendValuesResponse, ValueRange};
use super::{APPEND_RANGE, HEADER_RANGE, ID_COLUMN_RANGE, cell_text};
use crate::auth::GoogleAuth;
use crate::models::{MessageId, NormalizedRecord, SheetRow};
use crate::sync::Spreadsheet;

/// Google Sheets API client bound to one spreadsheet
pub struct SheetsClient {
    auth: Arc<GoogleAuth>,
    spreadsheet_id: String,
}

impl SheetsClient {
    /// Sheets API base URL
    const BASE_URL: &'static str = "https://sheets.googleapis.com/v4/spreadsheets";

    /// Create a new Sheets client sharing the given auth
    ///
    /// # Arguments
    /// * `spreadsheet_id` - Bare spreadsheet ID (see [`crate::config::parse_spreadsheet_id`])
    pub fn new(auth: Arc<GoogleAuth>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            auth,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            Self::BASE_URL,
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(range)
        )
    }

    /// Read the values of a range
    pub fn get_values(&self, range: &str) -> Result<ValueRange> {
        let access_token = self.auth.get_access_token()?;

        let mut response = ureq::get(&self.values_url(range))
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .with_context(|| format!("Failed to read range {}", range))?;

        let values: ValueRange = response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse values of range {}", range))?;

        Ok(values)
    }

    /// Overwrite a range with raw (unparsed) values
    pub fn update_values(&self, range: &str, rows: Vec<SheetRow>) -> Result<()> {
        let access_token = self.auth.get_access_token()?;
        let url = format!("{}?valueInputOption=RAW", self.values_url(range));

        ureq::put(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(&to_value_range(rows))
            .with_context(|| format!("Failed to write range {}", range))?;

        Ok(())
    }

    /// Append rows after the last row of a table, inserting new rows
    pub fn append_values(&self, range: &str, rows: Vec<SheetRow>) -> Result<AppendValuesResponse> {
        let access_token = self.auth.get_access_token()?;
        let url = format!(
            "{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.values_url(range)
        );

        let mut response = ureq::post(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(&to_value_range(rows))
            .with_context(|| format!("Failed to append to range {}", range))?;

        let appended: AppendValuesResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse append response")?;

        Ok(appended)
    }
}

impl Spreadsheet for SheetsClient {
    fn authenticate(&self) -> Result<()> {
        self.auth.get_access_token()?;
        Ok(())
    }

    fn ensure_headers(&self) -> Result<()> {
        let ensure = || -> Result<()> {
            let existing = self.get_values(HEADER_RANGE)?;
            if header_missing(&existing.values) {
                info!("Sheet is empty, writing header row");
                self.update_values(HEADER_RANGE, vec![SheetRow::header()])?;
            }
            Ok(())
        };

        ensure().context("Error ensuring headers")
    }

    fn existing_ids(&self) -> Result<HashSet<MessageId>> {
        let column = self
            .get_values(ID_COLUMN_RANGE)
            .context("Error fetching existing email IDs")?;
        let ids = ids_from_column(&column.values);
        debug!("Sheet already holds {} message ID(s)", ids.len());
        Ok(ids)
    }

    fn append(&self, records: &[NormalizedRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let rows = records.iter().map(NormalizedRecord::to_row).collect();
        let response = self
            .append_values(APPEND_RANGE, rows)
            .context("Error appending emails to sheet")?;

        if let Some(range) = response.updates.and_then(|u| u.updated_range) {
            debug!("Appended rows at {}", range);
        }
        Ok(())
    }
}

fn to_value_range(rows: Vec<SheetRow>) -> ValueRange {
    ValueRange {
        values: rows
            .into_iter()
            .map(|row| {
                row.into_cells()
                    .into_iter()
                    .map(serde_json::Value::String)
                    .collect()
            })
            .collect(),
        ..Default::default()
    }
}

/// True when the header range holds no values at all
pub(crate) fn header_missing(values: &[Vec<serde_json::Value>]) -> bool {
    values.iter().all(|row| row.is_empty())
}

/// Collect the non-empty IDs of an ID column, skipping the header row
pub(crate) fn ids_from_column(values: &[Vec<serde_json::Value>]) -> HashSet<MessageId> {
    values
        .iter()
        .skip(1)
        .filter_map(|row| row.first())
        .map(cell_text)
        .filter(|id| !id.is_empty())
        .map(MessageId::from)
        .collect()
}
