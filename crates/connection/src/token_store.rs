//! Session token persistence.
//!
//! The store, not the manager, is the source of truth for the token: the
//! manager reads it on every initialise and writes it before using a new
//! one.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Errors from token store operations.
#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Boxed future returned by [`TokenStore`] methods.
pub type StoreFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TokenStoreError>> + Send + 'a>>;

/// Where the session token lives.
pub trait TokenStore: Send + Sync + 'static {
    /// Returns the stored token, if any.
    fn get_token(&self) -> StoreFuture<'_, Option<String>>;

    /// Replaces the stored token.
    fn set_token(&self, token: String) -> StoreFuture<'_, ()>;

    /// Removes the stored token.
    fn clear_token(&self) -> StoreFuture<'_, ()>;
}

/// In-process token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn get_token(&self) -> StoreFuture<'_, Option<String>> {
        let token = self.slot().clone();
        Box::pin(async move { Ok(token) })
    }

    fn set_token(&self, token: String) -> StoreFuture<'_, ()> {
        *self.slot() = Some(token);
        Box::pin(async { Ok(()) })
    }

    fn clear_token(&self) -> StoreFuture<'_, ()> {
        *self.slot() = None;
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenFile {
    token: String,
}

/// Token store backed by a JSON file: `{"token": "..."}`.
///
/// The file is re-read on every [`get_token`](TokenStore::get_token) so
/// edits by other processes are picked up.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get_token(&self) -> StoreFuture<'_, Option<String>> {
        Box::pin(async move {
            let data = match tokio::fs::read_to_string(&self.path).await {
                Ok(data) => data,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let file: TokenFile = serde_json::from_str(&data)?;
            debug!(path = %self.path.display(), "loaded session token");
            Ok(Some(file.token).filter(|t| !t.is_empty()))
        })
    }

    fn set_token(&self, token: String) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let json = serde_json::to_string_pretty(&TokenFile { token })?;

            let mut options = tokio::fs::OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            options.mode(0o600);
            let mut file = options.open(&self.path).await?;

            // `mode` only applies on create; tighten a pre-existing file too.
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(0o600);
                file.set_permissions(perms).await?;
            }

            file.write_all(json.as_bytes()).await?;
            file.flush().await?;

            debug!(path = %self.path.display(), "persisted session token");
            Ok(())
        })
    }

    fn clear_token(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {
                    debug!(path = %self.path.display(), "removed session token");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }
}

/// Returns the default token file path.
pub fn default_token_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("chatlink").join("session.json"))
}

/// Returns the platform-specific config directory.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(".config"))
    }
}
