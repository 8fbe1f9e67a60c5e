//! Gmail API type definitions
//!
//! Wire types mirror the Gmail API responses. [`UnreadMessageSummary`] and
//! [`DraftReply`] are the values handed back to the tool surface.

use serde::{Deserialize, Serialize};

/// A Gmail message part (MIME part)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    /// Part ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,

    /// MIME type of this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Filename for attachments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Headers for this part
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,

    /// Body of this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<MessagePartBody>,

    /// Nested parts (for multipart messages)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

/// Header in a message part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Body of a message part
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePartBody {
    /// Attachment ID (if this is an attachment)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,

    /// Size in bytes
    #[serde(default)]
    pub size: i64,

    /// Base64url-encoded data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A Gmail message
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message ID
    pub id: String,

    /// Thread ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Label IDs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,

    /// Snippet (preview text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    /// Message payload (MIME structure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,

    /// Internal date (epoch millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_date: Option<String>,
}

/// List of messages response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    /// Messages in this page
    #[serde(default)]
    pub messages: Vec<MessageRef>,

    /// Next page token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,

    /// Result size estimate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_size_estimate: Option<u32>,
}

/// Reference to a message (id and thread_id only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    pub thread_id: String,
}

/// A Gmail thread with its messages, oldest first
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,

    #[serde(default)]
    pub messages: Vec<Message>,
}

/// A Gmail draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    /// Draft ID
    pub id: String,

    /// Draft message (id and threadId are populated by the API)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

/// Message body of a draft creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMessage {
    /// Base64url-encoded RFC 2822 message
    pub raw: String,

    /// Thread the draft belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Request to create a draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDraftRequest {
    pub message: DraftMessage,
}

/// One unread message as returned by `get_unread_emails`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadMessageSummary {
    pub thread_id: String,
    pub message_id: String,
    #[serde(rename = "from")]
    pub sender: String,
    pub subject: String,
    #[serde(rename = "date")]
    pub received_date: String,
    #[serde(rename = "body")]
    pub body_text: String,
}

/// Receipt for a draft created by `create_draft_reply`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftReply {
    pub draft_id: String,
    pub thread_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(rename = "message")]
    pub confirmation_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_deserialize() {
        let json = r#"{
            "id": "18c1",
            "threadId": "18c0",
            "labelIds": ["UNREAD", "INBOX"],
            "snippet": "Hi there",
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [{"name": "Subject", "value": "Hello"}],
                "parts": [
                    {"partId": "0", "mimeType": "text/plain", "body": {"size": 5, "data": "SGVsbG8"}}
                ]
            }
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.thread_id.as_deref(), Some("18c0"));
        let payload = message.payload.unwrap();
        assert_eq!(payload.parts.len(), 1);
        assert_eq!(payload.parts[0].body.as_ref().unwrap().data.as_deref(), Some("SGVsbG8"));
    }

    #[test]
    fn test_empty_message_list() {
        // Gmail omits `messages` entirely when nothing matches
        let list: MessageList = serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        assert!(list.messages.is_empty());
    }

    #[test]
    fn test_create_draft_request_serialize() {
        let request = CreateDraftRequest {
            message: DraftMessage {
                raw: "abc".to_string(),
                thread_id: Some("t1".to_string()),
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["message"]["threadId"], "t1");
        assert_eq!(value["message"]["raw"], "abc");
    }

    #[test]
    fn test_summary_wire_names() {
        let summary = UnreadMessageSummary {
            thread_id: "t".to_string(),
            message_id: "m".to_string(),
            sender: "a@example.com".to_string(),
            subject: "s".to_string(),
            received_date: "d".to_string(),
            body_text: "b".to_string(),
        };
        let value = serde_json::to_value(&summary).unwrap();
        for key in ["threadId", "messageId", "from", "subject", "date", "body"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_draft_reply_wire_names() {
        let reply = DraftReply {
            draft_id: "r1".to_string(),
            thread_id: "t1".to_string(),
            message_id: None,
            confirmation_text: "ok".to_string(),
        };
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["draftId"], "r1");
        assert_eq!(value["threadId"], "t1");
        assert_eq!(value["message"], "ok");
        assert!(value.get("messageId").is_none());
    }
}
