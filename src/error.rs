//! Error types for the Email MCP Server
//!
//! Every error maps onto one of the five [`ErrorKind`]s reported to the
//! assistant host.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Main error type for the Email MCP Server
#[derive(Error, Debug)]
pub enum GmailMcpError {
    /// OAuth authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Gmail API errors
    #[error("Gmail API error: {0}")]
    Gmail(#[from] GmailApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// OAuth authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth client file not found: {path}")]
    KeysFileNotFound { path: String },

    #[error("Invalid OAuth client file: expected 'installed' or 'web' credentials")]
    InvalidKeysFormat,

    #[error("Stored credential at {path} is corrupted ({message}); delete it and re-authenticate")]
    CorruptedCredentials { path: String, message: String },

    #[error("Failed to refresh access token: {message}")]
    TokenRefreshFailed { message: String },

    #[error("OAuth callback error: {message}")]
    CallbackError { message: String },

    #[error("Consent was declined: {reason}")]
    ConsentDeclined { reason: String },

    #[error("Timed out after {secs}s waiting for the OAuth callback")]
    ConsentTimedOut { secs: u64 },

    #[error("No authorization code provided")]
    NoAuthCode,

    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed { message: String },
}

/// Gmail API errors
#[derive(Error, Debug)]
pub enum GmailApiError {
    #[error("Thread not found: {thread_id}")]
    ThreadNotFound { thread_id: String },

    #[error("Message not found: {message_id}")]
    MessageNotFound { message_id: String },

    #[error("Failed to fetch mail: {message}")]
    FetchFailed { message: String },

    #[error("Failed to create draft: {message}")]
    DraftCreationFailed { message: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found: {path}")]
    DirNotFound { path: String },

    #[error("Failed to create config directory: {path}")]
    DirCreationFailed { path: String },
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid parameter: {name} - {message}")]
    InvalidParameter { name: String, message: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid tool arguments: {message}")]
    InvalidArguments { message: String },
}

/// Failure categories surfaced to the calling assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    AuthFailure,
    ValidationError,
    ThreadNotFound,
    FetchFailure,
    DraftCreationFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AuthFailure => "AuthFailure",
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::ThreadNotFound => "ThreadNotFound",
            ErrorKind::FetchFailure => "FetchFailure",
            ErrorKind::DraftCreationFailure => "DraftCreationFailure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GmailMcpError {
    /// Category of this error as reported on the tool surface
    pub fn kind(&self) -> ErrorKind {
        match self {
            GmailMcpError::Auth(_) | GmailMcpError::Config(_) => ErrorKind::AuthFailure,
            GmailMcpError::Validation(_) | GmailMcpError::Mcp(_) => ErrorKind::ValidationError,
            GmailMcpError::Gmail(GmailApiError::ThreadNotFound { .. }) => {
                ErrorKind::ThreadNotFound
            }
            GmailMcpError::Gmail(GmailApiError::DraftCreationFailed { .. }) => {
                ErrorKind::DraftCreationFailure
            }
            GmailMcpError::Gmail(_)
            | GmailMcpError::Io(_)
            | GmailMcpError::Json(_)
            | GmailMcpError::Http(_) => ErrorKind::FetchFailure,
        }
    }

    /// Re-tag a read-path error as a fetch failure.
    ///
    /// Auth, validation and thread lookups keep their own kind.
    pub fn into_fetch_failure(self) -> Self {
        match self {
            GmailMcpError::Gmail(GmailApiError::FetchFailed { .. })
            | GmailMcpError::Gmail(GmailApiError::ThreadNotFound { .. })
            | GmailMcpError::Auth(_)
            | GmailMcpError::Config(_)
            | GmailMcpError::Validation(_)
            | GmailMcpError::Mcp(_) => self,
            other => GmailMcpError::Gmail(GmailApiError::FetchFailed {
                message: other.to_string(),
            }),
        }
    }

    /// Re-tag a write-path error as a draft creation failure.
    pub fn into_draft_failure(self) -> Self {
        match self {
            GmailMcpError::Gmail(GmailApiError::DraftCreationFailed { .. })
            | GmailMcpError::Auth(_)
            | GmailMcpError::Config(_)
            | GmailMcpError::Validation(_)
            | GmailMcpError::Mcp(_) => self,
            other => GmailMcpError::Gmail(GmailApiError::DraftCreationFailed {
                message: other.to_string(),
            }),
        }
    }
}

/// Result type alias for Email MCP operations
pub type Result<T> = std::result::Result<T, GmailMcpError>;
