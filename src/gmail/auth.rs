//! OAuth authentication for Gmail API
//!
//! Handles OAuth 2.0 authentication flow including:
//! - Loading client credentials
//! - Interactive browser-based consent
//! - Token storage and refresh

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AuthError, GmailMcpError, Result};
use crate::gmail::store::CredentialStore;

/// Tokens expiring within this window are treated as expired
const EXPIRY_SKEW_SECS: i64 = 300;

/// OAuth client credentials
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthKeys {
    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Auth URI
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,

    /// Token URI
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// OAuth client file format (can be "installed" or "web")
#[derive(Debug, Deserialize)]
struct OAuthKeysFile {
    #[serde(alias = "web")]
    installed: Option<OAuthKeys>,
}

impl OAuthKeys {
    /// Load OAuth keys from a Google Cloud Console client file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GmailMcpError::Auth(AuthError::KeysFileNotFound {
                path: path.display().to_string(),
            }));
        }

        let content = std::fs::read_to_string(path)?;
        let keys_file: OAuthKeysFile = serde_json::from_str(&content)
            .map_err(|_| GmailMcpError::Auth(AuthError::InvalidKeysFormat))?;

        keys_file
            .installed
            .ok_or(GmailMcpError::Auth(AuthError::InvalidKeysFormat))
    }
}

/// Stored credentials (tokens)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// Access token
    pub access_token: String,

    /// Refresh token
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expiry timestamp (Unix seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,

    /// Scopes
    #[serde(default)]
    pub scope: String,

    /// OAuth client the tokens were issued to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl StoredCredentials {
    /// Whether the access token is expired (or about to be) at `now`
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.expiry_date {
            Some(expiry) => expiry.saturating_sub(now) < EXPIRY_SKEW_SECS,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

/// Token response from OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    #[serde(default)]
    scope: String,
}

impl TokenResponse {
    fn into_credentials(self, client_id: &str) -> StoredCredentials {
        let now = unix_now();
        StoredCredentials {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expiry_date: self.expires_in.map(|e| now.saturating_add(e)),
            scope: self.scope,
            client_id: Some(client_id.to_string()),
        }
    }
}

/// Authorization code returned by the consent flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentGrant {
    pub code: String,

    /// Redirect URI the code was issued for; must be echoed on exchange
    pub redirect_uri: String,
}

/// Token endpoint and consent capabilities of the OAuth provider
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Run the interactive consent flow and return the authorization code
    async fn authorize_interactive(&self) -> Result<ConsentGrant>;

    /// Exchange an authorization code for tokens
    async fn exchange_code(&self, grant: &ConsentGrant) -> Result<StoredCredentials>;

    /// Obtain a fresh access token from a refresh token
    async fn refresh_token(&self, refresh_token: &str) -> Result<StoredCredentials>;
}

/// Google OAuth 2.0 for installed applications
pub struct GoogleOAuth {
    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth client credentials
    keys: OAuthKeys,

    scopes: Vec<String>,
    callback_port: u16,
    consent_timeout: Duration,
}

impl GoogleOAuth {
    /// Create a provider from the client file named in `config`
    pub fn new(config: &Config) -> Result<Self> {
        let keys = OAuthKeys::load(&config.oauth_path)?;
        Ok(Self::with_keys(keys, config))
    }

    pub fn with_keys(keys: OAuthKeys, config: &Config) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            keys,
            scopes: config.scopes.clone(),
            callback_port: config.oauth_callback_port,
            consent_timeout: config.consent_timeout,
        }
    }

    /// Generate the authorization URL
    pub fn auth_url(&self, redirect_uri: &str) -> String {
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.keys.auth_uri,
            urlencoding::encode(&self.keys.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes)
        )
    }

    async fn request_tokens(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http_client
            .post(&self.keys.token_uri)
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Auth(AuthError::TokenExchangeFailed {
                message: format!("token endpoint returned {}: {}", status, text),
            }));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuth {
    async fn authorize_interactive(&self) -> Result<ConsentGrant> {
        use axum::{extract::Query, response::Html, routing::get, Router};
        use std::collections::HashMap;
        use tokio::sync::oneshot;

        let addr = std::net::SocketAddr::from(([127, 0, 0, 1], self.callback_port));
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            GmailMcpError::Auth(AuthError::CallbackError {
                message: format!("cannot bind callback listener on {}: {}", addr, e),
            })
        })?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}/oauth2callback", port);

        let auth_url = self.auth_url(&redirect_uri);
        eprintln!("\nPlease visit this URL to authorize Gmail access:");
        eprintln!("{}\n", auth_url);

        if let Err(e) = open::that(&auth_url) {
            eprintln!("Could not open browser automatically: {}", e);
            eprintln!("Please open the URL manually.");
        }

        // Channel for receiving the auth code, or the provider's refusal
        let (tx, rx) = oneshot::channel::<std::result::Result<String, String>>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        let tx_clone = tx.clone();
        let callback_handler = move |Query(params): Query<HashMap<String, String>>| async move {
            let outcome = match (params.get("code"), params.get("error")) {
                (Some(code), _) => Ok(code.clone()),
                (None, Some(error)) => Err(error.clone()),
                (None, None) => Err("no authorization code in callback".to_string()),
            };
            let succeeded = outcome.is_ok();
            if let Ok(mut guard) = tx_clone.lock() {
                if let Some(tx) = guard.take() {
                    let _ = tx.send(outcome);
                }
            }
            if succeeded {
                Html("<html><body><h1>Authorization successful!</h1><p>You can close this window.</p></body></html>")
            } else {
                Html("<html><body><h1>Authorization failed</h1><p>Return to the terminal for details.</p></body></html>")
            }
        };

        let app = Router::new().route("/oauth2callback", get(callback_handler));

        tracing::info!(port, "waiting for OAuth callback");

        let server = std::future::IntoFuture::into_future(axum::serve(listener, app));

        tokio::select! {
            result = server => {
                let message = match result {
                    Ok(()) => "callback server stopped unexpectedly".to_string(),
                    Err(e) => e.to_string(),
                };
                Err(GmailMcpError::Auth(AuthError::CallbackError { message }))
            }
            outcome = rx => {
                match outcome {
                    Ok(Ok(code)) => {
                        eprintln!("Received authorization code, exchanging for tokens...");
                        Ok(ConsentGrant { code, redirect_uri })
                    }
                    Ok(Err(reason)) => Err(GmailMcpError::Auth(AuthError::ConsentDeclined { reason })),
                    Err(_) => Err(GmailMcpError::Auth(AuthError::NoAuthCode)),
                }
            }
            _ = tokio::time::sleep(self.consent_timeout) => {
                Err(GmailMcpError::Auth(AuthError::ConsentTimedOut {
                    secs: self.consent_timeout.as_secs(),
                }))
            }
        }
    }

    async fn exchange_code(&self, grant: &ConsentGrant) -> Result<StoredCredentials> {
        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("code", grant.code.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", grant.redirect_uri.as_str()),
        ];

        let token_response = self.request_tokens(&params).await?;
        Ok(token_response.into_credentials(&self.keys.client_id))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<StoredCredentials> {
        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let token_response = self.request_tokens(&params).await.map_err(|e| {
            GmailMcpError::Auth(AuthError::TokenRefreshFailed {
                message: e.to_string(),
            })
        })?;
        Ok(token_response.into_credentials(&self.keys.client_id))
    }
}

/// Produces a valid credential, refreshing or asking for consent as needed
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    provider: Arc<dyn OAuthProvider>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>, provider: Arc<dyn OAuthProvider>) -> Self {
        Self { store, provider }
    }

    /// Check whether a credential has been stored
    pub async fn is_authenticated(&self) -> bool {
        matches!(self.store.load().await, Ok(Some(_)))
    }

    /// Return a usable credential.
    ///
    /// An unexpired stored credential is returned as is. An expired one is
    /// refreshed once; if that fails, or nothing is stored, the interactive
    /// consent flow runs.
    pub async fn get_valid_credential(&self) -> Result<StoredCredentials> {
        let stored = self.store.load().await.map_err(into_auth_failure)?;

        if let Some(creds) = stored {
            if !creds.is_expired() {
                return Ok(creds);
            }

            if let Some(refresh_token) = creds.refresh_token.clone() {
                match self.provider.refresh_token(&refresh_token).await {
                    Ok(mut fresh) => {
                        if fresh.refresh_token.is_none() {
                            fresh.refresh_token = Some(refresh_token);
                        }
                        if fresh.client_id.is_none() {
                            fresh.client_id = creds.client_id.clone();
                        }
                        self.store.save(&fresh).await.map_err(into_auth_failure)?;
                        tracing::info!(store = %self.store.location(), "refreshed access token");
                        return Ok(fresh);
                    }
                    Err(e) => {
                        tracing::warn!("token refresh failed, falling back to consent: {}", e);
                    }
                }
            } else {
                tracing::info!("stored credential expired and has no refresh token");
            }
        }

        self.run_consent().await
    }

    /// Get a valid access token
    pub async fn get_access_token(&self) -> Result<String> {
        Ok(self.get_valid_credential().await?.access_token)
    }

    async fn run_consent(&self) -> Result<StoredCredentials> {
        tracing::info!("starting interactive OAuth consent");

        let grant = self
            .provider
            .authorize_interactive()
            .await
            .map_err(into_auth_failure)?;
        let credentials = self
            .provider
            .exchange_code(&grant)
            .await
            .map_err(into_auth_failure)?;

        self.store
            .save(&credentials)
            .await
            .map_err(into_auth_failure)?;
        tracing::info!(store = %self.store.location(), "stored new credential");

        Ok(credentials)
    }
}

fn into_auth_failure(err: GmailMcpError) -> GmailMcpError {
    match err {
        GmailMcpError::Auth(_) => err,
        other => GmailMcpError::Auth(AuthError::TokenExchangeFailed {
            message: other.to_string(),
        }),
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_keys_deserialize() {
        let json = r#"{
            "installed": {
                "client_id": "test-client-id",
                "client_secret": "test-secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "redirect_uris": ["http://localhost"]
            }
        }"#;

        let keys_file: OAuthKeysFile = serde_json::from_str(json).unwrap();
        assert_eq!(keys_file.installed.unwrap().client_id, "test-client-id");
    }

    #[test]
    fn test_oauth_keys_web_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{"web": {"client_id": "web-id", "client_secret": "s"}}"#,
        )
        .unwrap();

        let keys = OAuthKeys::load(&path).unwrap();
        assert_eq!(keys.client_id, "web-id");
        assert_eq!(keys.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_oauth_keys_missing_file() {
        let err = OAuthKeys::load(Path::new("/nonexistent/credentials.json")).unwrap_err();
        assert!(matches!(
            err,
            GmailMcpError::Auth(AuthError::KeysFileNotFound { .. })
        ));
    }

    #[test]
    fn test_oauth_keys_wrong_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"service_account": {}}"#).unwrap();
        assert!(matches!(
            OAuthKeys::load(&path).unwrap_err(),
            GmailMcpError::Auth(AuthError::InvalidKeysFormat)
        ));
    }

    #[test]
    fn test_stored_credentials_serialize() {
        let creds = StoredCredentials {
            access_token: "test-token".to_string(),
            refresh_token: Some("refresh-token".to_string()),
            token_type: "Bearer".to_string(),
            expiry_date: Some(1234567890),
            scope: "https://www.googleapis.com/auth/gmail.readonly".to_string(),
            client_id: Some("client".to_string()),
        };

        let json = serde_json::to_string(&creds).unwrap();
        assert!(json.contains("test-token"));
        assert!(json.contains("refresh-token"));

        let back: StoredCredentials = serde_json::from_str(&json).unwrap();
        assert_eq!(back, creds);
    }

    #[test]
    fn test_expiry_skew() {
        let mut creds = StoredCredentials {
            access_token: "a".to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expiry_date: Some(10_000),
            scope: String::new(),
            client_id: None,
        };
        assert!(!creds.is_expired_at(10_000 - EXPIRY_SKEW_SECS - 1));
        assert!(creds.is_expired_at(10_000 - EXPIRY_SKEW_SECS + 1));
        assert!(creds.is_expired_at(20_000));

        creds.expiry_date = None;
        assert!(!creds.is_expired_at(i64::MAX));
    }

    #[test]
    fn test_expiry_extremes_do_not_overflow() {
        let mut creds = StoredCredentials {
            access_token: "a".to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expiry_date: Some(i64::MIN),
            scope: String::new(),
            client_id: None,
        };
        assert!(creds.is_expired());
        assert!(creds.is_expired_at(i64::MAX));

        creds.expiry_date = Some(i64::MAX);
        assert!(!creds.is_expired());
        assert!(!creds.is_expired_at(i64::MIN));
    }

    #[test]
    fn test_token_response_huge_expires_in() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","expires_in":9223372036854775807}"#,
        )
        .unwrap();
        let creds = response.into_credentials("client");
        assert_eq!(creds.expiry_date, Some(i64::MAX));
        assert_eq!(creds.client_id.as_deref(), Some("client"));
    }

    #[test]
    fn test_auth_url() {
        let keys = OAuthKeys {
            client_id: "id 1".to_string(),
            client_secret: "secret".to_string(),
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
        };
        let config = Config::with_dir("/tmp/email-mcp-test");
        let oauth = GoogleOAuth::with_keys(keys, &config);

        let url = oauth.auth_url("http://127.0.0.1:8080/oauth2callback");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("client_id=id%201"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Foauth2callback"));
        assert!(url.contains("gmail.compose"));
        assert!(url.contains("access_type=offline"));
    }
}
