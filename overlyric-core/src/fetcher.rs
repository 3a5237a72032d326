//! Resolves a lyrics document for a track: store lookup, network fetch, persist.

use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::AuthManager;
use crate::error::Result;
use crate::lyrics::{FetchErrorKind, LyricsDocument, SyncType};
use crate::playback::Track;
use crate::probe::MediaPlayerProbe;
use crate::service::{LyricsService, ServiceResponse};
use crate::store::LyricsStore;

const LOG_TARGET: &str = "overlyric::fetcher";

/// Which failed fetches are written to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Persist non-401/404 failures, so they stick until the track changes
    pub cache_unknown_errors: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            cache_unknown_errors: true,
        }
    }
}

pub struct LyricsFetcher {
    store: Arc<dyn LyricsStore>,
    probe: Arc<dyn MediaPlayerProbe>,
    service: Arc<dyn LyricsService>,
    auth: Arc<AuthManager>,
    policy: CachePolicy,
}

impl LyricsFetcher {
    pub fn new(
        store: Arc<dyn LyricsStore>,
        probe: Arc<dyn MediaPlayerProbe>,
        service: Arc<dyn LyricsService>,
        auth: Arc<AuthManager>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            store,
            probe,
            service,
            auth,
            policy,
        }
    }

    /// Resolve lyrics for `track`.
    ///
    /// Service failures come back as error documents. An `Unauthorized`
    /// document is returned as-is; refreshing the token and fetching again is
    /// up to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the track ID cannot be read from the player or no
    /// bearer token can be obtained.
    pub async fn fetch(&self, track: &mut Track) -> Result<LyricsDocument> {
        match self.store.get(&track.artist, &track.song).await {
            Ok(Some(document)) => {
                info!(target: LOG_TARGET, "Using stored lyrics for {}", track);
                return Ok(document);
            }
            Ok(None) => {}
            Err(e) => warn!(target: LOG_TARGET, "Failed to load lyrics for {}: {}", track, e),
        }

        let track_id = match &track.provider_id {
            Some(id) => id.clone(),
            None => {
                let id = self.probe.current_track_id().await?;
                track.provider_id = Some(id.clone());
                id
            }
        };

        let token = self.auth.obtain(false).await?;

        info!(
            target: LOG_TARGET,
            "Downloading lyrics for {} ({}) from {}…",
            track,
            track_id,
            self.service.name()
        );

        let response = match self.service.request(&track_id, &token).await {
            Ok(response) => response,
            Err(e) => {
                warn!(target: LOG_TARGET, "Lyrics request for {} failed: {}", track, e);
                return Ok(LyricsDocument::error(
                    &track.artist,
                    &track.song,
                    FetchErrorKind::Network,
                    e.to_string(),
                ));
            }
        };

        let document = match response {
            ServiceResponse::Found(remote) => match SyncType::from_wire(&remote.sync_type) {
                Some(sync_type) => {
                    let document =
                        LyricsDocument::document(&track.artist, &track.song, sync_type, remote.lines);
                    info!(target: LOG_TARGET, "Downloaded lyrics for {} ({})", track, track_id);
                    self.persist(track, &document).await;
                    return Ok(document);
                }
                None => LyricsDocument::error(
                    &track.artist,
                    &track.song,
                    FetchErrorKind::Unknown,
                    format!("Unsupported sync type '{}'", remote.sync_type),
                ),
            },
            ServiceResponse::Unauthorized => {
                return Ok(LyricsDocument::error(
                    &track.artist,
                    &track.song,
                    FetchErrorKind::Unauthorized,
                    "Bearer token was rejected",
                ));
            }
            ServiceResponse::NotFound => {
                info!(target: LOG_TARGET, "No lyrics available for {}", track);
                return Ok(LyricsDocument::error(
                    &track.artist,
                    &track.song,
                    FetchErrorKind::NotFound,
                    "Lyrics not found",
                ));
            }
            ServiceResponse::Failed { status, body } => LyricsDocument::error(
                &track.artist,
                &track.song,
                FetchErrorKind::Unknown,
                format!("HTTP {status}: {body}"),
            ),
        };

        warn!(target: LOG_TARGET, "Lyrics error for {} ({}): {:?}", track, track_id, document);
        if self.policy.cache_unknown_errors {
            self.persist(track, &document).await;
        }
        Ok(document)
    }

    async fn persist(&self, track: &Track, document: &LyricsDocument) {
        if let Err(e) = self.store.put(&track.artist, &track.song, document).await {
            warn!(target: LOG_TARGET, "Failed to store lyrics for {}: {}", track, e);
        }
    }
}
