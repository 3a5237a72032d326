//! Keeps the display in step with the player.
//!
//! Two cycles share one [`SessionState`]. The slow cycle polls the player and
//! loads lyrics when the track changes; the fast cycle extrapolates the
//! playback position between polls and pushes the active line to the display.
//! Both run on the same task, and the state lock is never held across I/O, so
//! rendering continues while a poll is stuck waiting on the user or the network.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::AuthManager;
use crate::config::SyncConfig;
use crate::display::{DisplaySink, DisplayUpdate};
use crate::error::Result;
use crate::fetcher::LyricsFetcher;
use crate::lyrics::{active_line_index, FetchError, FetchErrorKind, LyricLine, LyricsDocument, SyncType};
use crate::playback::{PlaybackSample, PlayerState, Track};
use crate::probe::MediaPlayerProbe;

/// Lyrics for the current track, as far as the session knows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LyricsState {
    #[default]
    None,
    Error(FetchError),
    Loaded { sync_type: SyncType, lines: Vec<LyricLine> },
}

impl From<LyricsDocument> for LyricsState {
    fn from(document: LyricsDocument) -> Self {
        match document {
            LyricsDocument::Document { sync_type, lines, .. } => Self::Loaded { sync_type, lines },
            LyricsDocument::Error { error, .. } => Self::Error(error),
        }
    }
}

/// What the display currently shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Shown {
    #[default]
    Nothing,
    /// Line `index` of the document loaded as `generation`
    Line { generation: u64, index: usize },
}

#[derive(Debug, Default)]
pub struct SessionState {
    pub track: Option<Track>,
    pub lyrics: LyricsState,
    /// Bumped whenever `lyrics` is replaced
    pub generation: u64,
    pub player_state: Option<PlayerState>,
    pub sample: PlaybackSample,
    shown: Shown,
}

impl SessionState {
    /// Decide what the display should show now; `None` leaves it as is.
    fn next_update(&mut self, now: Instant, lookahead_ms: u64, tick: Duration) -> Option<DisplayUpdate> {
        let LyricsState::Loaded { sync_type, lines } = &self.lyrics else {
            return self.show(Shown::Nothing, DisplayUpdate::cleared());
        };
        if self.player_state != Some(PlayerState::Playing) {
            return self.show(Shown::Nothing, DisplayUpdate::cleared());
        }

        let position = self.sample.extrapolated_position(now);
        let active = active_line_index(*sync_type, lines, position, self.sample.duration, lookahead_ms);
        let (target, update) = match active.and_then(|index| lines.get(index).map(|line| (index, line))) {
            Some((index, line)) => (
                Shown::Line {
                    generation: self.generation,
                    index,
                },
                DisplayUpdate::line(line.display_text(), *sync_type == SyncType::Unsynced),
            ),
            None => (Shown::Nothing, DisplayUpdate::cleared()),
        };

        self.sample.advance(tick);
        self.show(target, update)
    }

    fn show(&mut self, target: Shown, update: DisplayUpdate) -> Option<DisplayUpdate> {
        if self.shown == target {
            return None;
        }
        self.shown = target;
        Some(update)
    }

    fn set_player_state(&mut self, new: PlayerState) {
        match self.player_state {
            None if new == PlayerState::Playing => info!("Player is {}", new),
            None => info!("Player is {}, waiting for playback", new),
            Some(old) if old != new => info!("Player {} -> {}", old, new),
            Some(_) => {}
        }
        self.player_state = Some(new);
    }
}

/// Why [`SyncEngine::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineExit {
    Cancelled,
    DisplayClosed,
}

pub struct SyncEngine {
    probe: Arc<dyn MediaPlayerProbe>,
    fetcher: LyricsFetcher,
    auth: Arc<AuthManager>,
    sink: Arc<dyn DisplaySink>,
    poll_interval: Duration,
    render_interval: Duration,
    lookahead_ms: u64,
    state: Mutex<SessionState>,
}

impl SyncEngine {
    pub fn new(
        probe: Arc<dyn MediaPlayerProbe>,
        fetcher: LyricsFetcher,
        auth: Arc<AuthManager>,
        sink: Arc<dyn DisplaySink>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            probe,
            fetcher,
            auth,
            sink,
            poll_interval: config.poll_interval(),
            render_interval: config.render_interval(),
            lookahead_ms: config.lookahead_ms,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Drive both cycles until `cancel` fires or the display goes away
    pub async fn run(&self, cancel: CancellationToken) -> EngineExit {
        info!(
            "Starting sync engine (poll every {:?}, render every {:?})",
            self.poll_interval, self.render_interval
        );

        let exit = tokio::select! {
            () = cancel.cancelled() => EngineExit::Cancelled,
            never = self.poll_loop() => match never {},
            exit = self.render_loop() => exit,
        };

        info!("Sync engine stopped: {:?}", exit);
        exit
    }

    async fn poll_loop(&self) -> Infallible {
        loop {
            self.slow_cycle().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn render_loop(&self) -> EngineExit {
        let mut ticker = tokio::time::interval(self.render_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if !self.fast_cycle().await {
                return EngineExit::DisplayClosed;
            }
        }
    }

    /// Poll the player once. Failures are logged and end the iteration early.
    pub async fn slow_cycle(&self) {
        if let Err(e) = self.poll_player().await {
            warn!("Player poll abandoned: {}", e);
        }
    }

    async fn poll_player(&self) -> Result<()> {
        let mut track = self.probe.current_track().await?;

        let known = self
            .state
            .lock()
            .await
            .track
            .as_ref()
            .is_some_and(|current| current.is_same(&track));

        if !known {
            info!("Now playing: {}", track);
            let document = self.load_lyrics(&mut track).await?;
            match &document {
                LyricsDocument::Document { lines, .. } => {
                    info!("Loaded {} lyric lines for {}", lines.len(), track);
                }
                LyricsDocument::Error { error, .. } => {
                    info!("No lyrics for {}: {} ({})", track, error.kind, error.message);
                }
            }

            let mut state = self.state.lock().await;
            state.track = Some(track);
            state.lyrics = document.into();
            state.generation += 1;
        }

        let player_state = self.probe.player_state().await?;
        self.state.lock().await.set_player_state(player_state);

        let position = self.probe.player_position().await?;
        let duration = self.probe.track_duration().await?;
        debug!("Player at {:.2}s of {:.2}s", position, duration);
        self.state.lock().await.sample = PlaybackSample::new(position, duration);

        Ok(())
    }

    /// Fetch lyrics, refreshing the bearer token once if the service rejects it
    async fn load_lyrics(&self, track: &mut Track) -> Result<LyricsDocument> {
        let document = self.fetcher.fetch(track).await?;
        if document.error_kind() != Some(FetchErrorKind::Unauthorized) {
            return Ok(document);
        }

        warn!("Bearer token rejected, capturing a new one");
        self.auth.obtain(true).await?;
        self.fetcher.fetch(track).await
    }

    /// Render once. Returns `false` when the display has closed.
    pub async fn fast_cycle(&self) -> bool {
        if !self.sink.is_alive() {
            info!("Display closed");
            return false;
        }

        let update = self
            .state
            .lock()
            .await
            .next_update(Instant::now(), self.lookahead_ms, self.render_interval);

        if let Some(update) = update {
            self.sink.write(update).await;
        }
        true
    }

    /// Snapshot of the session for inspection
    pub async fn with_state<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&*self.state.lock().await)
    }
}
