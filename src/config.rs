//! Configuration management for the Email MCP Server
//!
//! Handles paths, environment variables, and configuration loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, GmailMcpError, Result};

/// File name of the OAuth client file (downloaded from Google Cloud Console)
pub const OAUTH_KEYS_FILE: &str = "credentials.json";

/// File name of the persisted user token
pub const TOKEN_FILE: &str = "token.json";

/// Configuration for the Email MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for storing configuration files
    pub config_dir: PathBuf,

    /// Path to OAuth client file (client id/secret)
    pub oauth_path: PathBuf,

    /// Path to the persisted user credential (access/refresh tokens)
    pub token_path: PathBuf,

    /// Loopback port for the OAuth callback; 0 picks an ephemeral port
    pub oauth_callback_port: u16,

    /// How long the consent flow waits for the browser callback
    pub consent_timeout: Duration,

    /// Gmail API scopes
    pub scopes: Vec<String>,
}

impl Config {
    /// Create a new configuration rooted at `~/.email-mcp`
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self::with_dir(config_dir))
    }

    /// Create a configuration rooted at an explicit directory.
    ///
    /// Environment overrides still apply.
    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();

        let oauth_path = std::env::var("GOOGLE_CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir.join(OAUTH_KEYS_FILE));

        let token_path = std::env::var("GOOGLE_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir.join(TOKEN_FILE));

        let oauth_callback_port = std::env::var("EMAIL_MCP_OAUTH_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);

        let consent_timeout = std::env::var("EMAIL_MCP_CONSENT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(300));

        Self {
            config_dir,
            oauth_path,
            token_path,
            oauth_callback_port,
            consent_timeout,
            scopes: vec![
                "https://www.googleapis.com/auth/gmail.readonly".to_string(),
                "https://www.googleapis.com/auth/gmail.compose".to_string(),
            ],
        }
    }

    /// Override the OAuth client file location
    pub fn with_oauth_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.oauth_path = path.into();
        self
    }

    /// Override the token file location
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Get the configuration directory, creating it if necessary
    fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| {
                GmailMcpError::Config(ConfigError::DirNotFound {
                    path: "~".to_string(),
                })
            })?
            .join(".email-mcp");

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|_| {
                GmailMcpError::Config(ConfigError::DirCreationFailed {
                    path: config_dir.display().to_string(),
                })
            })?;
        }

        Ok(config_dir)
    }

    /// Check if the OAuth client file exists
    pub fn oauth_keys_exist(&self) -> bool {
        self.oauth_path.exists()
    }

    /// Copy `credentials.json` from `dir` into place if the configured file is missing
    pub fn find_and_copy_oauth_keys(&self, dir: &Path) -> Result<bool> {
        let local_oauth = dir.join(OAUTH_KEYS_FILE);

        if local_oauth.exists() && !self.oauth_keys_exist() {
            if let Some(parent) = self.oauth_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&local_oauth, &self.oauth_path)?;
            tracing::info!(
                from = %local_oauth.display(),
                to = %self.oauth_path.display(),
                "copied OAuth client file"
            );
            return Ok(true);
        }

        Ok(false)
    }
}

/// Gmail API constants
pub mod gmail {
    /// Base URL for Gmail API
    pub const API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

    /// User ID for the authenticated user
    pub const USER_ID: &str = "me";

    /// Provider query selecting unread messages
    pub const UNREAD_QUERY: &str = "is:unread";

    /// System label carried by unsent drafts
    pub const DRAFT_LABEL: &str = "DRAFT";

    /// Default number of unread messages returned
    pub const DEFAULT_UNREAD_LIMIT: i64 = 10;

    /// Bounds applied to the unread limit
    pub const MIN_UNREAD_LIMIT: i64 = 1;
    pub const MAX_UNREAD_LIMIT: i64 = 50;
}
