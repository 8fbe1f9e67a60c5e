//! Mail operations exposed as tools
//!
//! Both operations are stateless: each call asks the [`Authenticator`] for a
//! credential, talks to [`MailApi`], and returns freshly built values.

use std::sync::Arc;

use crate::config::gmail::{DRAFT_LABEL, MAX_UNREAD_LIMIT, MIN_UNREAD_LIMIT, UNREAD_QUERY};
use crate::error::{GmailApiError, GmailMcpError, Result, ValidationError};
use crate::gmail::auth::Authenticator;
use crate::gmail::client::MailApi;
use crate::gmail::reply::ReplyEnvelope;
use crate::gmail::types::{
    CreateDraftRequest, DraftMessage, DraftReply, Message, UnreadMessageSummary,
};
use crate::gmail::utils::{encode_raw_message, extract_body, message_header};

/// Clamp a requested unread limit into the supported range
pub fn clamp_limit(limit: i64) -> u32 {
    limit.clamp(MIN_UNREAD_LIMIT, MAX_UNREAD_LIMIT) as u32
}

pub struct MailService {
    authenticator: Arc<Authenticator>,
    api: Arc<dyn MailApi>,
}

impl MailService {
    pub fn new(authenticator: Arc<Authenticator>, api: Arc<dyn MailApi>) -> Self {
        Self { authenticator, api }
    }

    /// List unread messages, newest first as ordered by Gmail.
    ///
    /// `limit` is clamped to `1..=50`. A failure fetching any single message
    /// fails the whole call; partial listings are never returned.
    pub async fn list_unread(&self, limit: i64) -> Result<Vec<UnreadMessageSummary>> {
        let limit = clamp_limit(limit);
        let token = self.authenticator.get_access_token().await?;

        let refs = self
            .api
            .list_message_ids(&token, UNREAD_QUERY, limit)
            .await
            .map_err(GmailMcpError::into_fetch_failure)?;

        let mut summaries = Vec::with_capacity(refs.len().min(limit as usize));
        for msg_ref in refs.into_iter().take(limit as usize) {
            let message = self
                .api
                .get_message(&token, &msg_ref.id)
                .await
                .map_err(GmailMcpError::into_fetch_failure)?;

            summaries.push(summarize(message, &msg_ref.thread_id));
        }

        tracing::info!(count = summaries.len(), limit, "listed unread messages");
        Ok(summaries)
    }

    /// Create a draft reply in an existing thread.
    ///
    /// Not idempotent: every call creates a new draft, so callers must not
    /// retry blindly.
    pub async fn create_draft_reply(&self, thread_id: &str, reply_body: &str) -> Result<DraftReply> {
        if thread_id.trim().is_empty() {
            return Err(missing("thread_id"));
        }
        if thread_id.trim() != thread_id {
            return Err(GmailMcpError::Validation(ValidationError::InvalidParameter {
                name: "thread_id".to_string(),
                message: "must not have leading or trailing whitespace".to_string(),
            }));
        }
        if reply_body.trim().is_empty() {
            return Err(missing("reply_body"));
        }

        let token = self.authenticator.get_access_token().await?;

        let thread = self
            .api
            .get_thread(&token, thread_id)
            .await
            .map_err(GmailMcpError::into_fetch_failure)?;

        // Existing drafts are listed as thread messages; reply to real mail only
        let original = thread
            .messages
            .iter()
            .rev()
            .find(|m| !is_draft(m))
            .ok_or_else(|| {
                GmailMcpError::Gmail(GmailApiError::ThreadNotFound {
                    thread_id: thread_id.to_string(),
                })
            })?;

        let envelope = ReplyEnvelope::for_message(original, reply_body);
        let request = CreateDraftRequest {
            message: DraftMessage {
                raw: encode_raw_message(&envelope.to_mime()),
                thread_id: Some(thread_id.to_string()),
            },
        };

        let draft = self
            .api
            .create_draft(&token, &request)
            .await
            .map_err(GmailMcpError::into_draft_failure)?;

        let draft_message = draft.message.as_ref();
        if let Some(actual) = draft_message.and_then(|m| m.thread_id.as_deref()) {
            if actual != thread_id {
                return Err(GmailMcpError::Gmail(GmailApiError::DraftCreationFailed {
                    message: format!(
                        "draft {} was filed under thread {} instead of {}",
                        draft.id, actual, thread_id
                    ),
                }));
            }
        }

        tracing::info!(draft_id = %draft.id, thread_id, "created draft reply");

        Ok(DraftReply {
            confirmation_text: format!(
                "Draft reply {} created in thread {} (to: {}, subject: {}). It has not been sent.",
                draft.id, thread_id, envelope.to, envelope.subject
            ),
            message_id: draft_message.map(|m| m.id.clone()),
            draft_id: draft.id,
            thread_id: thread_id.to_string(),
        })
    }
}

fn summarize(message: Message, listed_thread_id: &str) -> UnreadMessageSummary {
    UnreadMessageSummary {
        thread_id: message
            .thread_id
            .clone()
            .unwrap_or_else(|| listed_thread_id.to_string()),
        sender: message_header(&message, "From"),
        subject: message_header(&message, "Subject"),
        received_date: message_header(&message, "Date"),
        body_text: extract_body(&message),
        message_id: message.id,
    }
}

fn is_draft(message: &Message) -> bool {
    message.label_ids.iter().any(|label| label == DRAFT_LABEL)
}

fn missing(field: &str) -> GmailMcpError {
    GmailMcpError::Validation(ValidationError::MissingField {
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(10), 10);
        assert_eq!(clamp_limit(1), 1);
        assert_eq!(clamp_limit(50), 50);
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-7), 1);
        assert_eq!(clamp_limit(51), 50);
        assert_eq!(clamp_limit(i64::MAX), 50);
    }

    #[test]
    fn test_summarize_uses_listing_thread_when_missing() {
        let message = Message {
            id: "m1".to_string(),
            snippet: Some("preview".to_string()),
            ..Default::default()
        };
        let summary = summarize(message, "t-listed");
        assert_eq!(summary.thread_id, "t-listed");
        assert_eq!(summary.message_id, "m1");
        assert_eq!(summary.body_text, "preview");
        assert_eq!(summary.sender, "");
    }

    #[test]
    fn test_is_draft() {
        let mut message = Message::default();
        assert!(!is_draft(&message));
        message.label_ids = vec!["INBOX".to_string(), "DRAFT".to_string()];
        assert!(is_draft(&message));
    }
}
