//! Media player queries.

use crate::error::ProbeError;
use crate::playback::{PlayerState, Track};
use async_trait::async_trait;
use std::fmt;

/// One question the player can answer, one call per question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerQuery {
    CurrentArtist,
    CurrentSong,
    CurrentTrackId,
    PlayerState,
    PlayerPosition,
    /// Duration of the current track, in milliseconds
    CurrentTrackDuration,
}

impl PlayerQuery {
    /// The player's scripting verb for this query
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentArtist => "artist of current track",
            Self::CurrentSong => "name of current track",
            Self::CurrentTrackId => "id of the current track",
            Self::PlayerState => "player state",
            Self::PlayerPosition => "player position",
            Self::CurrentTrackDuration => "duration of current track",
        }
    }
}

impl fmt::Display for PlayerQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text-command interface to the media player.
///
/// Implementations answer a single query with the player's trimmed plain-text
/// output. The typed helpers below are built on top of [`query`](Self::query).
#[async_trait]
pub trait MediaPlayerProbe: Send + Sync {
    /// Run one query and return its trimmed output.
    async fn query(&self, query: PlayerQuery) -> Result<String, ProbeError>;

    /// Artist and song of the current track
    async fn current_track(&self) -> Result<Track, ProbeError> {
        let artist = self.query(PlayerQuery::CurrentArtist).await?;
        let song = self.query(PlayerQuery::CurrentSong).await?;
        Ok(Track::new(artist, song))
    }

    /// Provider-internal ID: the last segment of e.g. `spotify:track:<id>`
    async fn current_track_id(&self) -> Result<String, ProbeError> {
        let raw = self.query(PlayerQuery::CurrentTrackId).await?;
        Ok(trailing_segment(&raw).to_string())
    }

    async fn player_state(&self) -> Result<PlayerState, ProbeError> {
        self.query(PlayerQuery::PlayerState).await?.parse()
    }

    /// Playback position in seconds
    async fn player_position(&self) -> Result<f64, ProbeError> {
        let raw = self.query(PlayerQuery::PlayerPosition).await?;
        parse_number(PlayerQuery::PlayerPosition, &raw)
    }

    /// Track duration in seconds (the player reports milliseconds)
    async fn track_duration(&self) -> Result<f64, ProbeError> {
        let raw = self.query(PlayerQuery::CurrentTrackDuration).await?;
        Ok(parse_number(PlayerQuery::CurrentTrackDuration, &raw)? / 1000.0)
    }
}

fn trailing_segment(raw: &str) -> &str {
    raw.rsplit(':').next().unwrap_or(raw).trim()
}

fn parse_number(query: PlayerQuery, raw: &str) -> Result<f64, ProbeError> {
    // AppleScript may format reals with a locale decimal comma
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ProbeError::InvalidNumber {
            query: query.as_str().to_string(),
            value: raw.to_string(),
        })
}
