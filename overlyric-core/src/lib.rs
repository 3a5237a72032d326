pub mod auth;
pub mod config;
pub mod display;
pub mod error;
pub mod fetcher;
pub mod lyrics;
pub mod paths;
pub mod playback;
pub mod probe;
pub mod service;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

pub use auth::{AuthManager, AuthToken, CredentialCapture, OneShot, TokenStore};
pub use config::{
    build_config_template, AuthConfig, LoggingConfig, LyricsConfig, OverlyricConfig,
    ProvidersConfig, SyncConfig,
};
pub use display::{DisplaySink, DisplayUpdate};
pub use error::{AuthError, CoreError, ProbeError, Result};
pub use fetcher::{CachePolicy, LyricsFetcher};
pub use lyrics::{
    active_line_index, sanitize, FetchError, FetchErrorKind, LyricLine, LyricsDocument, SyncType,
};
pub use paths::{
    config_dir, config_path, extension_dir, log_file_path, lyrics_dir, token_path,
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, EXTENSION_DIR_NAME, LOG_FILE_NAME, LYRICS_DIR_NAME,
    TOKEN_FILE_NAME,
};
pub use playback::{PlaybackSample, PlayerState, Track};
pub use probe::{MediaPlayerProbe, PlayerQuery};
pub use service::{LyricsService, RemoteLyrics, ServiceResponse};
pub use store::{FileLyricsStore, LyricsStore};
pub use sync::{EngineExit, LyricsState, SessionState, SyncEngine};

