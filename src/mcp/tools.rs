//! MCP Tool definitions and handlers
//!
//! Defines the two mail tools, validates their arguments and shapes every
//! outcome into a [`CallToolResult`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::config::gmail::{DEFAULT_UNREAD_LIMIT, MAX_UNREAD_LIMIT, MIN_UNREAD_LIMIT};
use crate::error::{GmailMcpError, McpError, Result, ValidationError};
use crate::gmail::service::MailService;
use crate::mcp::types::{CallToolResult, Tool};

pub const GET_UNREAD_EMAILS: &str = "get_unread_emails";
pub const CREATE_DRAFT_REPLY: &str = "create_draft_reply";

/// Tool handler
pub struct ToolHandler {
    mail: Arc<MailService>,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(mail: Arc<MailService>) -> Self {
        Self { mail }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def(
                GET_UNREAD_EMAILS,
                "Fetch unread emails from Gmail. Returns sender, subject, date, body, message ID, and thread ID for each email.",
                get_unread_emails_schema(),
            ),
            tool_def(
                CREATE_DRAFT_REPLY,
                "Create a draft reply in an existing email thread. The draft is saved, not sent. Each call creates a new draft.",
                create_draft_reply_schema(),
            ),
        ]
    }

    /// Call a tool by name. Errors never escape; they become failure results.
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        let outcome = match name {
            GET_UNREAD_EMAILS => self.handle_get_unread_emails(args).await,
            CREATE_DRAFT_REPLY => self.handle_create_draft_reply(args).await,
            _ => Err(GmailMcpError::Mcp(McpError::UnknownTool {
                name: name.to_string(),
            })),
        };

        match outcome {
            Ok(payload) => CallToolResult::json(payload),
            Err(e) => {
                tracing::warn!(tool = name, kind = %e.kind(), "tool call failed: {}", e);
                CallToolResult::failure(&e)
            }
        }
    }

    // ==================== Tool Handlers ====================

    async fn handle_get_unread_emails(&self, args: Value) -> Result<Value> {
        let limit = parse_limit(&args)?;
        let emails = self.mail.list_unread(limit).await?;

        Ok(json!({
            "count": emails.len(),
            "emails": emails,
        }))
    }

    async fn handle_create_draft_reply(&self, args: Value) -> Result<Value> {
        #[derive(Deserialize, Validate)]
        struct Args {
            #[serde(alias = "threadId")]
            #[validate(length(min = 1, message = "thread_id must not be empty"))]
            thread_id: String,

            #[serde(alias = "replyBody")]
            #[validate(length(min = 1, message = "reply_body must not be empty"))]
            reply_body: String,
        }

        let args: Args = parse_args(args)?;
        args.validate().map_err(|e| {
            GmailMcpError::Validation(ValidationError::InvalidParameter {
                name: "arguments".to_string(),
                message: e.to_string(),
            })
        })?;

        let draft = self
            .mail
            .create_draft_reply(&args.thread_id, &args.reply_body)
            .await?;
        Ok(serde_json::to_value(draft)?)
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| {
        GmailMcpError::Mcp(McpError::InvalidArguments {
            message: e.to_string(),
        })
    })
}

/// Read the optional `limit` argument.
///
/// Non-integers are rejected; integers outside the supported range are
/// clamped later by the operation.
fn parse_limit(args: &Value) -> Result<i64> {
    let raw = match args {
        Value::Null => return Ok(DEFAULT_UNREAD_LIMIT),
        Value::Object(map) => map.get("limit"),
        _ => {
            return Err(GmailMcpError::Mcp(McpError::InvalidArguments {
                message: "arguments must be an object".to_string(),
            }))
        }
    };

    match raw {
        None | Some(Value::Null) => Ok(DEFAULT_UNREAD_LIMIT),
        Some(value) => value
            .as_i64()
            .or_else(|| value.as_u64().map(|_| i64::MAX))
            .ok_or_else(|| {
                GmailMcpError::Validation(ValidationError::InvalidParameter {
                    name: "limit".to_string(),
                    message: format!("expected an integer, got {}", value),
                })
            }),
    }
}

fn tool_def(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
    }
}

fn get_unread_emails_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "limit": {
                "type": "integer",
                "description": format!(
                    "Maximum number of emails to fetch (default: {}, clamped to {}-{})",
                    DEFAULT_UNREAD_LIMIT, MIN_UNREAD_LIMIT, MAX_UNREAD_LIMIT
                ),
                "default": DEFAULT_UNREAD_LIMIT,
                "minimum": MIN_UNREAD_LIMIT,
                "maximum": MAX_UNREAD_LIMIT
            }
        },
        "required": []
    })
}

fn create_draft_reply_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "thread_id": {
                "type": "string",
                "description": "The thread ID from get_unread_emails to reply to"
            },
            "reply_body": {
                "type": "string",
                "description": "The plain-text body of the reply"
            }
        },
        "required": ["thread_id", "reply_body"]
    })
}
