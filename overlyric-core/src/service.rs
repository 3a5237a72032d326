use crate::auth::AuthToken;
use crate::error::CoreError;
use crate::lyrics::LyricLine;
use async_trait::async_trait;
use serde::Deserialize;

/// Lyrics payload of a successful service response
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteLyrics {
    /// Raw `syncType` literal; interpreted by the fetcher
    #[serde(rename = "syncType")]
    pub sync_type: String,
    pub lines: Vec<LyricLine>,
}

/// Outcome of one lyrics request that produced an HTTP response
#[derive(Debug, Clone)]
pub enum ServiceResponse {
    Found(RemoteLyrics),
    Unauthorized,
    NotFound,
    Failed { status: u16, body: String },
}

/// Remote lyrics service
#[async_trait]
pub trait LyricsService: Send + Sync {
    fn name(&self) -> &'static str;

    /// Request lyrics for a provider-internal track ID.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response was received.
    async fn request(&self, track_id: &str, token: &AuthToken) -> Result<ServiceResponse, CoreError>;
}
