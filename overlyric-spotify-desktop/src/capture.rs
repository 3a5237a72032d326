//! Interactive bearer token capture.
//!
//! The web client is opened in the user's browser, where the bundled forwarder
//! extension (see [`crate::extension`]) posts the player's outgoing API requests
//! to a local `POST /observe` server. The first forwarded request to the API
//! host that carries an `authorization` header completes the capture.

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use overlyric_core::{AuthError, CoreError, CredentialCapture, OneShot};
use serde::Deserialize;
use std::collections::HashMap;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::SpotifyProviderConfig;
use crate::extension::ForwarderExtension;

pub(crate) const OBSERVE_PATH: &str = "/observe";

/// One request the browser made, as forwarded to the capture server
#[derive(Debug, Clone, Deserialize)]
pub struct ObservedRequest {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ObservedRequest {
    /// The `authorization` header value, if this request went to `api_host`
    #[must_use]
    pub fn authorization_for(&self, api_host: &str) -> Option<&str> {
        let url = url::Url::parse(&self.url).ok()?;
        if url.host_str()? != api_host {
            return None;
        }
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Clone)]
struct ObserverState {
    api_host: Arc<str>,
    slot: Arc<OneShot<String>>,
}

pub struct BrowserCapture {
    web_client_url: String,
    api_host: String,
    addr: SocketAddr,
    extension: ForwarderExtension,
    extension_dir: PathBuf,
}

impl BrowserCapture {
    /// Capture for `config`, writing the forwarder extension to `extension_dir`
    ///
    /// # Errors
    ///
    /// Returns an error if `capture_addr` is not a socket address.
    pub fn new(config: &SpotifyProviderConfig, extension_dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let addr = config.capture_socket_addr()?;
        Ok(Self {
            web_client_url: config.web_client_url.clone(),
            api_host: config.api_host.clone(),
            addr,
            extension: ForwarderExtension::new(&config.api_host, addr),
            extension_dir: extension_dir.into(),
        })
    }

    /// Bind the capture server and refresh the forwarder extension on disk.
    ///
    /// A failed extension write is logged; a copy loaded earlier still works.
    async fn listen(&self) -> Result<TcpListener, AuthError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| AuthError::Capture {
                reason: format!("Failed to bind to {}: {e}", self.addr),
            })?;
        if let Err(e) = self.extension.install(&self.extension_dir).await {
            warn!(
                "Failed to write forwarder extension to {:?}: {}",
                self.extension_dir, e
            );
        }
        Ok(listener)
    }

    fn prompt_sign_in(&self, addr: SocketAddr) {
        info!("");
        info!("╔════════════════════════════════════════════════════════════════╗");
        info!("║                   Spotify sign-in required                     ║");
        info!("╠════════════════════════════════════════════════════════════════╣");
        info!("║ Opening the web player in your browser...                      ║");
        info!("║                                                                ║");
        info!("║ First time? Load the token forwarder extension (Chromium):     ║");
        info!("║   1. Open chrome://extensions and enable Developer mode        ║");
        info!("║   2. Click \"Load unpacked\" and pick the directory below        ║");
        info!("╚════════════════════════════════════════════════════════════════╝");
        info!("{}", self.extension_dir.display());
        info!("");

        if let Err(e) = open::that(&self.web_client_url) {
            warn!("Could not open browser automatically: {}", e);
            info!("Please open this URL manually:\n{}", self.web_client_url);
        }

        info!(
            "Waiting for requests to {} forwarded to http://{}{}...",
            self.api_host, addr, OBSERVE_PATH
        );
    }
}

#[async_trait]
impl CredentialCapture for BrowserCapture {
    async fn capture(&self) -> Result<String, AuthError> {
        let listener = self.listen().await?;
        self.prompt_sign_in(self.addr);
        serve_until_captured(listener, &self.api_host).await
    }
}

/// Serve `/observe` on `listener` until a bearer token for `api_host` arrives.
///
/// The server is dropped as soon as the token is delivered.
///
/// # Errors
///
/// Returns an error if the server stops before a token arrives.
pub async fn serve_until_captured(listener: TcpListener, api_host: &str) -> Result<String, AuthError> {
    let (slot, rx) = OneShot::new();
    let app = observer_router(api_host, slot);
    let server = axum::serve(listener, app).into_future();

    tokio::select! {
        result = rx => result.map_err(|_| AuthError::Capture {
            reason: "Capture channel closed unexpectedly".into(),
        }),
        result = server => Err(AuthError::Capture {
            reason: match result {
                Ok(()) => "Capture server stopped unexpectedly".into(),
                Err(e) => format!("Capture server failed: {e}"),
            },
        }),
    }
}

fn observer_router(api_host: &str, slot: Arc<OneShot<String>>) -> Router {
    Router::new()
        .route(OBSERVE_PATH, post(observe))
        .with_state(ObserverState {
            api_host: api_host.into(),
            slot,
        })
}

async fn observe(
    State(state): State<ObserverState>,
    Json(request): Json<ObservedRequest>,
) -> (StatusCode, &'static str) {
    let Some(token) = request.authorization_for(&state.api_host) else {
        debug!("Ignoring forwarded request to {}", request.url);
        return (StatusCode::ACCEPTED, "ignored");
    };

    if state.slot.fire(token.to_string()).await {
        info!("Captured bearer token from {}", request.url);
        (StatusCode::OK, "captured")
    } else {
        (StatusCode::ACCEPTED, "ignored")
    }
}
