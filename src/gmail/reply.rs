//! Threaded reply construction
//!
//! Builds the RFC 2822 message for a draft reply from the headers of the
//! message being answered.

use crate::gmail::types::Message;
use crate::gmail::utils::{encode_mime_header, message_header};

/// Headers and body of a reply to an existing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEnvelope {
    pub to: String,
    pub subject: String,
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
    pub body: String,
}

impl ReplyEnvelope {
    /// Build a reply to `original` carrying `body`
    pub fn for_message(original: &Message, body: &str) -> Self {
        let reply_to = message_header(original, "Reply-To");
        let to = if reply_to.trim().is_empty() {
            message_header(original, "From")
        } else {
            reply_to
        };

        let message_id = message_header(original, "Message-ID");
        let message_id = message_id.trim();
        let references = reply_references(&message_header(original, "References"), message_id);

        Self {
            to,
            subject: reply_subject(&message_header(original, "Subject")),
            in_reply_to: (!message_id.is_empty()).then(|| message_id.to_string()),
            references,
            body: body.to_string(),
        }
    }

    /// Render as an RFC 2822 message with CRLF line endings
    pub fn to_mime(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("To: {}", single_line(&self.to)));
        lines.push(format!("Subject: {}", encode_mime_header(&single_line(&self.subject))));

        if let Some(ref in_reply_to) = self.in_reply_to {
            lines.push(format!("In-Reply-To: {}", single_line(in_reply_to)));
        }
        if let Some(ref references) = self.references {
            lines.push(format!("References: {}", single_line(references)));
        }

        let encoding = if self.body.is_ascii() { "7bit" } else { "8bit" };
        lines.push("MIME-Version: 1.0".to_string());
        lines.push("Content-Type: text/plain; charset=UTF-8".to_string());
        lines.push(format!("Content-Transfer-Encoding: {}", encoding));
        lines.push(String::new());
        lines.push(self.body.replace("\r\n", "\n").replace('\n', "\r\n"));

        lines.join("\r\n")
    }
}

/// Prefix a subject with `Re: ` unless it already carries one
pub fn reply_subject(subject: &str) -> String {
    let subject = subject.trim();
    if subject.is_empty() {
        return String::new();
    }
    let already_reply = subject
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"));
    if already_reply {
        subject.to_string()
    } else {
        format!("Re: {}", subject)
    }
}

/// Extend a References chain with the id of the message being answered
pub fn reply_references(references: &str, message_id: &str) -> Option<String> {
    let mut chain: Vec<&str> = references.split_whitespace().collect();
    if !message_id.is_empty() && !chain.contains(&message_id) {
        chain.push(message_id);
    }
    if chain.is_empty() {
        None
    } else {
        Some(chain.join(" "))
    }
}

fn single_line(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::types::{Header, MessagePart};

    fn original(headers: &[(&str, &str)]) -> Message {
        Message {
            id: "m1".to_string(),
            thread_id: Some("t1".to_string()),
            payload: Some(MessagePart {
                headers: headers
                    .iter()
                    .map(|(name, value)| Header {
                        name: name.to_string(),
                        value: value.to_string(),
                    })
                    .collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_reply_subject_prefix() {
        assert_eq!(reply_subject("Meeting notes"), "Re: Meeting notes");
        assert_eq!(reply_subject("Re: Meeting notes"), "Re: Meeting notes");
        assert_eq!(reply_subject("RE: Meeting notes"), "RE: Meeting notes");
        assert_eq!(reply_subject("re:Meeting notes"), "re:Meeting notes");
        assert_eq!(reply_subject("Regarding notes"), "Re: Regarding notes");
        assert_eq!(reply_subject(""), "");
    }

    #[test]
    fn test_reply_subject_multibyte() {
        assert_eq!(reply_subject("日本"), "Re: 日本");
    }

    #[test]
    fn test_reply_references() {
        assert_eq!(reply_references("", "<c@x>").as_deref(), Some("<c@x>"));
        assert_eq!(
            reply_references("<a@x> <b@x>", "<c@x>").as_deref(),
            Some("<a@x> <b@x> <c@x>")
        );
        assert_eq!(
            reply_references("<a@x>\r\n <c@x>", "<c@x>").as_deref(),
            Some("<a@x> <c@x>")
        );
        assert_eq!(reply_references("", ""), None);
    }

    #[test]
    fn test_envelope_from_original() {
        let msg = original(&[
            ("From", "Alice <alice@example.com>"),
            ("Subject", "Meeting notes"),
            ("Message-Id", "<m2@example.com>"),
            ("References", "<m1@example.com>"),
        ]);

        let envelope = ReplyEnvelope::for_message(&msg, "Thanks!");
        assert_eq!(envelope.to, "Alice <alice@example.com>");
        assert_eq!(envelope.subject, "Re: Meeting notes");
        assert_eq!(envelope.in_reply_to.as_deref(), Some("<m2@example.com>"));
        assert_eq!(
            envelope.references.as_deref(),
            Some("<m1@example.com> <m2@example.com>")
        );
    }

    #[test]
    fn test_envelope_prefers_reply_to() {
        let msg = original(&[
            ("From", "alice@example.com"),
            ("Reply-To", "list@example.com"),
        ]);
        let envelope = ReplyEnvelope::for_message(&msg, "ok");
        assert_eq!(envelope.to, "list@example.com");
        assert_eq!(envelope.in_reply_to, None);
        assert_eq!(envelope.references, None);
    }

    #[test]
    fn test_to_mime() {
        let envelope = ReplyEnvelope {
            to: "bob@example.com".to_string(),
            subject: "Re: Hi".to_string(),
            in_reply_to: Some("<a@x>".to_string()),
            references: Some("<a@x>".to_string()),
            body: "line one\nline two".to_string(),
        };
        let mime = envelope.to_mime();
        assert!(mime.starts_with("To: bob@example.com\r\n"));
        assert!(mime.contains("\r\nSubject: Re: Hi\r\n"));
        assert!(mime.contains("\r\nIn-Reply-To: <a@x>\r\n"));
        assert!(mime.contains("\r\nReferences: <a@x>\r\n"));
        assert!(mime.contains("Content-Transfer-Encoding: 7bit"));
        assert!(mime.ends_with("\r\n\r\nline one\r\nline two"));
    }

    #[test]
    fn test_to_mime_non_ascii() {
        let envelope = ReplyEnvelope {
            to: "bob@example.com".to_string(),
            subject: "Re: Café".to_string(),
            in_reply_to: None,
            references: None,
            body: "Merci beaucoup, à bientôt".to_string(),
        };
        let mime = envelope.to_mime();
        assert!(mime.contains("Subject: =?UTF-8?B?"));
        assert!(mime.contains("Content-Transfer-Encoding: 8bit"));
        assert!(!mime.contains("In-Reply-To"));
    }

    #[test]
    fn test_header_injection_is_flattened() {
        let envelope = ReplyEnvelope {
            to: "bob@example.com\r\nBcc: evil@example.com".to_string(),
            subject: "Re: x".to_string(),
            in_reply_to: None,
            references: None,
            body: String::new(),
        };
        let mime = envelope.to_mime();
        assert!(mime.starts_with("To: bob@example.com Bcc: evil@example.com\r\n"));
    }
}
