//! Gmail API HTTP client
//!
//! Lists unread inbox messages and clears their unread label.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;

use super::api::{GmailMessage, ListMessagesResponse, ModifyMessageRequest};
use super::to_raw_message;
use crate::auth::GoogleAuth;
use crate::config::DEFAULT_MAX_MESSAGES;
use crate::models::{MessageId, RawMessage};
use crate::sync::Mailbox;

/// Search query selecting the messages to sync
pub const UNREAD_QUERY: &str = "is:unread in:inbox";

/// Label removed to mark a message read
pub const UNREAD_LABEL: &str = "UNREAD";

/// Gmail API client
pub struct GmailClient {
    auth: Arc<GoogleAuth>,
    max_messages: usize,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Largest page the list endpoint accepts
    const MAX_PAGE_SIZE: usize = 500;

    /// Create a new Gmail client sharing the given auth
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self {
            auth,
            max_messages: DEFAULT_MAX_MESSAGES,
        }
    }

    /// Set how many unread messages one run fetches (clamped to 1-500)
    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages.clamp(1, Self::MAX_PAGE_SIZE);
        self
    }

    /// List message IDs matching a search query (single page)
    ///
    /// # Arguments
    /// * `query` - Gmail search query, e.g. [`UNREAD_QUERY`]
    /// * `max_results` - Maximum number of messages to return
    pub fn list_messages(&self, query: &str, max_results: usize) -> Result<ListMessagesResponse> {
        let access_token = self.auth.get_access_token()?;

        let url = format!(
            "{}/users/me/messages?q={}&maxResults={}",
            Self::BASE_URL,
            urlencoding::encode(query),
            max_results.min(Self::MAX_PAGE_SIZE)
        );

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .context("Failed to send list messages request")?;

        let list: ListMessagesResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse list messages response")?;

        Ok(list)
    }

    /// Get full message details by ID
    pub fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        let access_token = self.auth.get_access_token()?;

        let url = format!(
            "{}/users/me/messages/{}?format=full",
            Self::BASE_URL,
            urlencoding::encode(id.as_str())
        );

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .with_context(|| format!("Failed to send get message request for {}", id))?;

        let message: GmailMessage = response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse message response for {}", id))?;

        Ok(message)
    }

    /// Add and remove labels on a single message
    pub fn modify_message(
        &self,
        id: &MessageId,
        add_labels: &[&str],
        remove_labels: &[&str],
    ) -> Result<()> {
        let access_token = self.auth.get_access_token()?;

        let url = format!(
            "{}/users/me/messages/{}/modify",
            Self::BASE_URL,
            urlencoding::encode(id.as_str())
        );

        let request = ModifyMessageRequest {
            add_label_ids: add_labels.iter().map(|l| l.to_string()).collect(),
            remove_label_ids: remove_labels.iter().map(|l| l.to_string()).collect(),
        };

        ureq::post(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(&request)
            .with_context(|| format!("Failed to modify labels on {}", id))?;

        Ok(())
    }
}

impl Mailbox for GmailClient {
    fn authenticate(&self) -> Result<()> {
        self.auth.get_access_token()?;
        Ok(())
    }

    fn list_unread(&self) -> Result<Vec<RawMessage>> {
        let fetch = || -> Result<Vec<RawMessage>> {
            let refs = self
                .list_messages(UNREAD_QUERY, self.max_messages)?
                .messages
                .unwrap_or_default();
            debug!("Unread query matched {} message(s)", refs.len());

            refs.iter()
                .map(|r| {
                    self.get_message(&MessageId::new(&r.id))
                        .map(to_raw_message)
                })
                .collect()
        };

        fetch().context("Error fetching emails")
    }

    fn mark_read(&self, ids: &[MessageId]) -> Result<()> {
        for id in ids {
            self.modify_message(id, &[], &[UNREAD_LABEL])
                .context("Error marking emails as read")?;
        }
        info!("Cleared {} label on {} message(s)", UNREAD_LABEL, ids.len());
        Ok(())
    }
}
