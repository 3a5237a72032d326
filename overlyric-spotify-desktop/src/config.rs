//! Spotify provider configuration.

use const_format::concatcp;
use overlyric_core::{CoreError, ProvidersConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Provider name used in config file
pub const PROVIDER_NAME: &str = "spotify";

/// Scriptable application name of the desktop client
pub const DEFAULT_APPLICATION: &str = "Spotify";

/// Page opened for the user to sign in
pub const DEFAULT_WEB_CLIENT_URL: &str = "https://open.spotify.com/";

/// Host whose requests carry the web client's bearer token
pub const DEFAULT_API_HOST: &str = "gew4-spclient.spotify.com";

/// Where the capture server listens for forwarded requests
pub const DEFAULT_CAPTURE_ADDR: &str = "127.0.0.1:8899";

/// Lyrics endpoint; the track ID is appended as the last path segment
pub const DEFAULT_LYRICS_API_URL: &str = "https://spclient.wg.spotify.com/color-lyrics/v2/track";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Spotify-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyProviderConfig {
    pub application: String,
    pub web_client_url: String,
    pub api_host: String,
    pub capture_addr: String,
    pub lyrics_api_url: String,
    pub request_timeout_secs: u64,
    /// Retries for transient transport failures; 0 disables the retry middleware
    pub max_retries: u32,
}

impl Default for SpotifyProviderConfig {
    fn default() -> Self {
        Self {
            application: DEFAULT_APPLICATION.into(),
            web_client_url: DEFAULT_WEB_CLIENT_URL.into(),
            api_host: DEFAULT_API_HOST.into(),
            capture_addr: DEFAULT_CAPTURE_ADDR.into(),
            lyrics_api_url: DEFAULT_LYRICS_API_URL.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: 0,
        }
    }
}

impl SpotifyProviderConfig {
    /// Extract Spotify config from the dynamic providers config, defaulting when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be parsed or is invalid.
    pub fn from_providers(providers: &ProvidersConfig) -> Result<Self, CoreError> {
        let config = providers.get::<Self>(PROVIDER_NAME)?.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Validate URLs and addresses.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.application.is_empty() || self.application.contains(['\'', '"']) {
            return Err(invalid("application", "must be a plain application name"));
        }
        for (field, value) in [
            ("web_client_url", &self.web_client_url),
            ("lyrics_api_url", &self.lyrics_api_url),
        ] {
            url::Url::parse(value).map_err(|e| invalid(field, e))?;
        }
        if self.api_host.is_empty() {
            return Err(CoreError::ConfigMissingField {
                field: "providers.spotify.api_host".into(),
            });
        }
        self.capture_socket_addr()?;
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be greater than zero"));
        }
        Ok(())
    }

    /// Parsed `capture_addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not `ip:port`.
    pub fn capture_socket_addr(&self) -> Result<SocketAddr, CoreError> {
        self.capture_addr
            .parse()
            .map_err(|e| invalid("capture_addr", e))
    }
}

fn invalid(field: &str, reason: impl std::fmt::Display) -> CoreError {
    CoreError::ConfigInvalid {
        message: format!("providers.spotify.{field}: {reason}"),
    }
}

/// Config template for Spotify provider.
/// This is appended to the base config template when creating a new config file.
pub const CONFIG_TEMPLATE: &str = concatcp!(
    "[providers.spotify]\n",
    "# Desktop client queried over AppleScript\n",
    "application = \"",
    DEFAULT_APPLICATION,
    "\"\n",
    "# Opened in the browser when a new bearer token is needed\n",
    "web_client_url = \"",
    DEFAULT_WEB_CLIENT_URL,
    "\"\n",
    "# Forwarded requests to this host are searched for an authorization header\n",
    "api_host = \"",
    DEFAULT_API_HOST,
    "\"\n",
    "# POST /observe on this address accepts forwarded requests\n",
    "capture_addr = \"",
    DEFAULT_CAPTURE_ADDR,
    "\"\n",
    "lyrics_api_url = \"",
    DEFAULT_LYRICS_API_URL,
    "\"\n",
    "request_timeout_secs = 10\n",
    "max_retries = 0\n"
);
