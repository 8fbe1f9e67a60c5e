//! Gmail API client
//!
//! [`MailApi`] is the narrow slice of Gmail the mail operations rely on;
//! [`GmailClient`] implements it over the REST API.

use async_trait::async_trait;

use crate::config::gmail::{API_BASE_URL, USER_ID};
use crate::error::{GmailApiError, GmailMcpError, Result};
use crate::gmail::types::*;

/// Remote mail capabilities, each call authorized by a bearer token
#[async_trait]
pub trait MailApi: Send + Sync {
    /// List message references matching a search query
    async fn list_message_ids(
        &self,
        access_token: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>>;

    /// Get a message with headers and full MIME payload
    async fn get_message(&self, access_token: &str, message_id: &str) -> Result<Message>;

    /// Get a thread with all of its messages
    async fn get_thread(&self, access_token: &str, thread_id: &str) -> Result<Thread>;

    /// Create a draft (not sent)
    async fn create_draft(&self, access_token: &str, request: &CreateDraftRequest) -> Result<Draft>;
}

/// Gmail API client
pub struct GmailClient {
    /// HTTP client
    http_client: reqwest::Client,

    base_url: String,
}

impl GmailClient {
    /// Create a new Gmail client
    pub fn new() -> Self {
        Self::with_base_url(API_BASE_URL)
    }

    /// Create a client against a different API root
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL for messages
    fn messages_url(&self) -> String {
        format!("{}/users/{}/messages", self.base_url, USER_ID)
    }

    /// Base URL for threads
    fn threads_url(&self) -> String {
        format!("{}/users/{}/threads", self.base_url, USER_ID)
    }

    /// Base URL for drafts
    fn drafts_url(&self) -> String {
        format!("{}/users/{}/drafts", self.base_url, USER_ID)
    }
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailApi for GmailClient {
    async fn list_message_ids(
        &self,
        access_token: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>> {
        let url = format!(
            "{}?q={}&maxResults={}",
            self.messages_url(),
            urlencoding::encode(query),
            max_results
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Gmail(GmailApiError::FetchFailed {
                message: format!("Failed to list messages ({}): {}", status, text),
            }));
        }

        let message_list: MessageList = response.json().await?;
        tracing::debug!(count = message_list.messages.len(), "listed messages");
        Ok(message_list.messages)
    }

    async fn get_message(&self, access_token: &str, message_id: &str) -> Result<Message> {
        let url = format!(
            "{}/{}?format=full",
            self.messages_url(),
            urlencoding::encode(message_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else if response.status().as_u16() == 404 {
            Err(GmailMcpError::Gmail(GmailApiError::MessageNotFound {
                message_id: message_id.to_string(),
            }))
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::FetchFailed {
                message: format!("Failed to get message {} ({}): {}", message_id, status, text),
            }))
        }
    }

    async fn get_thread(&self, access_token: &str, thread_id: &str) -> Result<Thread> {
        let url = format!(
            "{}/{}?format=full",
            self.threads_url(),
            urlencoding::encode(thread_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else if status.as_u16() == 404 || status.as_u16() == 400 {
            // Malformed ids come back as 400 "Invalid id value"
            Err(GmailMcpError::Gmail(GmailApiError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            }))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::FetchFailed {
                message: format!("Failed to get thread {} ({}): {}", thread_id, status, text),
            }))
        }
    }

    async fn create_draft(&self, access_token: &str, request: &CreateDraftRequest) -> Result<Draft> {
        let response = self
            .http_client
            .post(self.drafts_url())
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::DraftCreationFailed {
                message: format!("Failed to create draft ({}): {}", status, text),
            }))
        }
    }
}
