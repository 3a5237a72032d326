//! Bearer token lifecycle for the lyrics service.
//!
//! The token is obtained lazily on first use and replaced only on demand:
//! when the service rejects it, or when the user asks for a fresh one. There is
//! no expiry timer.

use crate::error::AuthError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

/// The single live bearer credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// Opaque header value, including any `Bearer ` prefix the client sent
    pub value: String,
    pub obtained_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            obtained_at: Utc::now(),
        }
    }
}

/// Interactive source of a fresh bearer token
#[async_trait]
pub trait CredentialCapture: Send + Sync {
    /// Wait until the user's session yields a bearer credential.
    ///
    /// May wait indefinitely for the user.
    async fn capture(&self) -> Result<String, AuthError>;
}

/// Completion that resolves exactly once.
///
/// The first [`fire`](Self::fire) delivers its value; every later call is a
/// no-op returning `false`, however many matching events keep arriving.
pub struct OneShot<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T: Send> OneShot<T> {
    /// Create the primitive and the receiver its value will arrive on
    #[must_use]
    pub fn new() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                sender: Mutex::new(Some(tx)),
            }),
            rx,
        )
    }

    /// Resolve with `value`; returns `true` only for the call that resolved it
    pub async fn fire(&self, value: T) -> bool {
        let sender = self.sender.lock().await.take();
        match sender {
            Some(sender) => sender.send(value).is_ok(),
            None => false,
        }
    }
}

/// `token.json`: the bearer string serialized as JSON
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted token, if any.
    ///
    /// `obtained_at` is taken from the file's modification time.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<Option<AuthToken>, AuthError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value: String = serde_json::from_str(&content)?;

        let obtained_at = tokio::fs::metadata(&self.path)
            .await
            .and_then(|meta| meta.modified())
            .map_or_else(|_| Utc::now(), DateTime::<Utc>::from);

        Ok(Some(AuthToken { value, obtained_at }))
    }

    /// Persist `token`, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, token: &AuthToken) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(&token.value)?;
        tokio::fs::write(&self.path, content).await?;
        debug!("Saved bearer token to {:?}", self.path);
        Ok(())
    }

    /// Remove the persisted token; a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be removed.
    pub async fn delete(&self) -> Result<(), AuthError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Deleted bearer token at {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Owner of the bearer token used for lyrics requests
pub struct AuthManager {
    store: TokenStore,
    capture: Arc<dyn CredentialCapture>,
    /// Held for the whole of `obtain`, so captures never overlap
    current: Mutex<Option<AuthToken>>,
}

impl AuthManager {
    pub fn new(store: TokenStore, capture: Arc<dyn CredentialCapture>) -> Self {
        Self {
            store,
            capture,
            current: Mutex::new(None),
        }
    }

    /// Return the bearer token, capturing a new one when needed.
    ///
    /// With `force_refresh` the persisted token is deleted first and a new
    /// capture always runs. Otherwise the live token is reused, then the
    /// persisted one, and only then does capture start.
    ///
    /// Capture waits on the user with no timeout, so this call can block the
    /// slow cycle indefinitely. Rendering continues meanwhile.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the token file cannot be handled or capture fails.
    pub async fn obtain(&self, force_refresh: bool) -> Result<AuthToken, AuthError> {
        let mut current = self.current.lock().await;

        if force_refresh {
            info!("Discarding bearer token");
            *current = None;
            self.store.delete().await?;
        } else {
            if let Some(token) = current.as_ref() {
                return Ok(token.clone());
            }

            match self.store.load().await {
                Ok(Some(token)) => {
                    info!("Loaded bearer token");
                    *current = Some(token.clone());
                    return Ok(token);
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to load bearer token: {}", e),
            }
        }

        info!("Obtaining bearer token…");
        let token = AuthToken::new(self.capture.capture().await?);
        self.store.save(&token).await?;
        info!("Obtained bearer token");

        *current = Some(token.clone());
        Ok(token)
    }
}
