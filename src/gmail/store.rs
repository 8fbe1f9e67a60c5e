//! Credential persistence
//!
//! The Authenticator reads and writes the user credential through a
//! [`CredentialStore`], so tests can swap the token file for memory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{AuthError, GmailMcpError, Result};
use crate::gmail::auth::StoredCredentials;

/// Durable home of the user credential
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the credential, `None` if none has been stored yet
    async fn load(&self) -> Result<Option<StoredCredentials>>;

    /// Replace the stored credential
    async fn save(&self, credentials: &StoredCredentials) -> Result<()>;

    /// Human-readable location, used in log lines and errors
    fn location(&self) -> String;
}

/// Credential stored as pretty JSON in a single file
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<StoredCredentials>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(GmailMcpError::Io(e)),
        };

        let credentials = serde_json::from_str(&content).map_err(|e| {
            GmailMcpError::Auth(AuthError::CorruptedCredentials {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })
        })?;

        tracing::debug!(path = %self.path.display(), "loaded stored credential");
        Ok(Some(credentials))
    }

    async fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(credentials)?;

        // Write then rename so readers never see a partial file
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content).await?;
        restrict_permissions(&tmp_path).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!(path = %self.path.display(), "stored credential");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// In-process store, used by tests and embedders that manage tokens themselves
#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<Option<StoredCredentials>>,
    saves: AtomicUsize,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: StoredCredentials) -> Self {
        Self {
            credentials: Mutex::new(Some(credentials)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful `save` calls
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn current(&self) -> Option<StoredCredentials> {
        self.credentials.lock().await.clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<StoredCredentials>> {
        Ok(self.credentials.lock().await.clone())
    }

    async fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        *self.credentials.lock().await = Some(credentials.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
