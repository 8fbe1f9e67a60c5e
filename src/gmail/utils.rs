//! Gmail utility functions
//!
//! Transport encoding helpers and body extraction from MIME message parts.

use std::sync::LazyLock;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use regex::Regex;

use crate::error::{GmailApiError, GmailMcpError, Result};
use crate::gmail::types::{Message, MessagePart};

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));

static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|head)\b[^>]*>.*?</(script|style|head)\s*>")
        .expect("valid script/style regex")
});

static BLOCK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*/?\s*(br|p|div|li|tr|table|blockquote|h[1-6])\b[^>]*>")
        .expect("valid block tag regex")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Encode text for MIME header (RFC 2047)
pub fn encode_mime_header(text: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && c != '\r' && c != '\n') {
        return text.to_string();
    }

    format!(
        "=?UTF-8?B?{}?=",
        base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
    )
}

/// Encode a raw email message for Gmail API (base64url, no padding)
pub fn encode_raw_message(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Decode base64url data from Gmail API.
///
/// Accepts padded and unpadded input.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    let data = data.trim();
    URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(data))
        .or_else(|_| base64::engine::general_purpose::STANDARD.decode(data))
        .map_err(|e| {
            GmailMcpError::Gmail(GmailApiError::FetchFailed {
                message: format!("undecodable body data: {}", e),
            })
        })
}

/// Decode base64url data to a string, replacing invalid UTF-8 sequences
pub fn decode_base64url_string(data: &str) -> Result<String> {
    let bytes = decode_base64url(data)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Find header value by name (case-insensitive)
pub fn find_header<'a>(part: &'a MessagePart, name: &str) -> Option<&'a str> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Header value of a message, or an empty string when absent
pub fn message_header(message: &Message, name: &str) -> String {
    message
        .payload
        .as_ref()
        .and_then(|p| find_header(p, name))
        .unwrap_or("")
        .to_string()
}

/// Extract a readable body from a message.
///
/// Order of preference: first `text/plain` part (depth-first), first
/// `text/html` part with markup stripped, then the provider snippet.
pub fn extract_body(message: &Message) -> String {
    if let Some(payload) = message.payload.as_ref() {
        if let Some(text) = find_text_part(payload, "text/plain") {
            return text;
        }
        if let Some(html) = find_text_part(payload, "text/html") {
            return strip_html(&html);
        }
    }

    tracing::debug!(message_id = %message.id, "no text body part, using snippet");
    message
        .snippet
        .as_deref()
        .map(decode_entities)
        .unwrap_or_default()
}

fn find_text_part(part: &MessagePart, mime_type: &str) -> Option<String> {
    if base_mime_type(part).eq_ignore_ascii_case(mime_type) && !is_attachment(part) {
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
            match decode_base64url_string(data) {
                Ok(decoded) if !decoded.trim().is_empty() => return Some(decoded),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("skipping {} part: {}", mime_type, e);
                }
            }
        }
    }

    part.parts
        .iter()
        .find_map(|child| find_text_part(child, mime_type))
}

fn base_mime_type(part: &MessagePart) -> &str {
    part.mime_type
        .as_deref()
        .and_then(|m| m.split(';').next())
        .map(str::trim)
        .unwrap_or("")
}

fn is_attachment(part: &MessagePart) -> bool {
    part.filename.as_deref().is_some_and(|f| !f.is_empty())
}

/// Reduce an HTML document to plain text
pub fn strip_html(html: &str) -> String {
    let text = COMMENT_RE.replace_all(html, "");
    let text = SCRIPT_STYLE_RE.replace_all(&text, "");
    let text = BLOCK_TAG_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, "");
    let text = decode_entities(&text);

    let mut out: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

/// Decode HTML character references; non-breaking spaces become plain spaces
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).replace('\u{a0}', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::types::{Header, MessagePartBody};

    fn part(mime: &str, data: Option<&str>, parts: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            mime_type: Some(mime.to_string()),
            body: Some(MessagePartBody {
                data: data.map(encode_raw_message),
                ..Default::default()
            }),
            parts,
            ..Default::default()
        }
    }

    fn message(payload: MessagePart) -> Message {
        Message {
            id: "m1".to_string(),
            payload: Some(payload),
            ..Default::default()
        }
    }

    #[test]
    fn test_encode_mime_header_ascii() {
        assert_eq!(encode_mime_header("Hello World"), "Hello World");
    }

    #[test]
    fn test_encode_mime_header_unicode() {
        let encoded = encode_mime_header("Héllo Wörld");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert!(encoded.ends_with("?="));
    }

    #[test]
    fn test_decode_base64url() {
        assert_eq!(decode_base64url_string("SGVsbG8gV29ybGQ").unwrap(), "Hello World");
        // padded input also accepted
        assert_eq!(decode_base64url_string("SGVsbG8gV29ybGQ=").unwrap(), "Hello World");
        assert!(decode_base64url("!!not base64!!").is_err());
    }

    #[test]
    fn test_find_header_case_insensitive() {
        let payload = MessagePart {
            headers: vec![Header {
                name: "Message-ID".to_string(),
                value: "<a@b>".to_string(),
            }],
            ..Default::default()
        };
        assert_eq!(find_header(&payload, "message-id"), Some("<a@b>"));
        assert_eq!(find_header(&payload, "References"), None);
    }

    #[test]
    fn test_extract_top_level_plain() {
        let msg = message(part("text/plain", Some("plain body"), vec![]));
        assert_eq!(extract_body(&msg), "plain body");
    }

    #[test]
    fn test_extract_prefers_first_plain_depth_first() {
        let msg = message(part(
            "multipart/mixed",
            None,
            vec![
                part(
                    "multipart/alternative",
                    None,
                    vec![
                        part("text/html", Some("<p>html</p>"), vec![]),
                        part("text/plain", Some("nested plain"), vec![]),
                    ],
                ),
                part("text/plain", Some("later plain"), vec![]),
            ],
        ));
        assert_eq!(extract_body(&msg), "nested plain");
    }

    #[test]
    fn test_extract_falls_back_to_html() {
        let msg = message(part(
            "multipart/alternative",
            None,
            vec![part(
                "text/html",
                Some("<html><body><p>Hello&nbsp;<b>there</b></p><p>Bye &amp; thanks</p></body></html>"),
                vec![],
            )],
        ));
        assert_eq!(extract_body(&msg), "Hello there\n\nBye & thanks");
    }

    #[test]
    fn test_extract_skips_text_attachments() {
        let mut attachment = part("text/plain", Some("attached file"), vec![]);
        attachment.filename = Some("notes.txt".to_string());
        let msg = message(part(
            "multipart/mixed",
            None,
            vec![attachment, part("text/html", Some("<div>real</div>"), vec![])],
        ));
        assert_eq!(extract_body(&msg), "real");
    }

    #[test]
    fn test_extract_snippet_fallback() {
        let msg = Message {
            id: "m1".to_string(),
            snippet: Some("It&#39;s here".to_string()),
            payload: Some(part("multipart/mixed", None, vec![])),
            ..Default::default()
        };
        assert_eq!(extract_body(&msg), "It's here");
    }

    #[test]
    fn test_extract_has_no_encoding_artifacts() {
        let raw = "Line one\r\nLine two with ünïcode";
        let msg = message(part("text/plain", Some(raw), vec![]));
        let body = extract_body(&msg);
        assert_eq!(body, raw);
        assert!(!body.contains(&encode_raw_message(raw)));
    }

    #[test]
    fn test_strip_html_removes_script_and_style() {
        let html = "<head><title>x</title></head><style>p{color:red}</style><script>alert(1)</script><p>Visible</p><!-- hidden -->";
        assert_eq!(strip_html(html), "Visible");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#65;&#x42; &bogus;"), "a <b> AB &bogus;");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("&eacute;&euro;&copy;&nbsp;"), "\u{e9}\u{20ac}\u{a9} ");
    }

    #[test]
    fn test_strip_html_decodes_named_entities() {
        assert_eq!(
            strip_html("<p>Caf&eacute; costs &euro;5 &mdash; ok</p>"),
            "Caf\u{e9} costs \u{20ac}5 \u{2014} ok"
        );
    }
}
