use crate::error::ProbeError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// The track the player currently reports
#[derive(Debug, Clone, Default)]
pub struct Track {
    pub artist: String,
    pub song: String,
    /// Provider-internal track ID, resolved lazily when lyrics are fetched
    pub provider_id: Option<String>,
}

impl Track {
    pub fn new(artist: impl Into<String>, song: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            song: song.into(),
            provider_id: None,
        }
    }

    /// Tracks are the same when artist and song match exactly
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        self.artist == other.artist && self.song == other.song
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.song)
    }
}

/// Whether the player is advancing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Playing,
    Paused,
}

impl PlayerState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerState {
    type Err = ProbeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "playing" => Ok(Self::Playing),
            "paused" => Ok(Self::Paused),
            other => Err(ProbeError::UnexpectedState {
                value: other.to_string(),
            }),
        }
    }
}

/// Last observed playback position, advanced between observations
#[derive(Debug, Clone, Copy)]
pub struct PlaybackSample {
    /// Position in seconds
    pub position: f64,
    /// Track duration in seconds
    pub duration: f64,
    /// When `position` was valid
    pub captured_at: Instant,
}

impl Default for PlaybackSample {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl PlaybackSample {
    #[must_use]
    pub fn new(position: f64, duration: f64) -> Self {
        Self {
            position,
            duration,
            captured_at: Instant::now(),
        }
    }

    /// Position at `now`, assuming playback never stopped. Not clamped to the duration.
    #[must_use]
    pub fn extrapolated_position(&self, now: Instant) -> f64 {
        self.position + now.saturating_duration_since(self.captured_at).as_secs_f64()
    }

    /// Move the sample forward by one render tick.
    ///
    /// `captured_at` moves with `position`, so the extrapolated position is
    /// unchanged; the next player poll overwrites both.
    pub fn advance(&mut self, tick: Duration) {
        self.position += tick.as_secs_f64();
        self.captured_at += tick;
    }
}
