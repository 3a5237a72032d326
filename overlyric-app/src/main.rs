mod display;

use crate::display::TerminalSink;
use overlyric_core::{
    AuthManager, CachePolicy, CoreError, EngineExit, FileLyricsStore, LyricsFetcher,
    MediaPlayerProbe, OverlyricConfig, SyncEngine, TokenStore,
};
use overlyric_lyrics_spotify::SpotifyLyricsService;
use overlyric_spotify_desktop::{
    BrowserCapture, OsascriptProbe, SpotifyProviderConfig, SPOTIFY_CONFIG_TEMPLATE,
};
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    // Check config for logging.enabled before full config load
    let file_logging_enabled = check_file_logging_enabled();
    init_tracing(file_logging_enabled);

    // Load config or create template on first run
    let provider_templates: &[&str] = &[SPOTIFY_CONFIG_TEMPLATE];
    let config = match OverlyricConfig::load_or_create(Some(provider_templates)) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let spotify = match SpotifyProviderConfig::from_providers(&config.providers) {
        Ok(spotify) => spotify,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler to trigger graceful shutdown
    let cancel_token = CancellationToken::new();
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    match runtime.block_on(run(config, spotify, cancel_token)) {
        Ok(EngineExit::Cancelled) => info!("Interrupted"),
        Ok(EngineExit::DisplayClosed) => info!("Display closed"),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}

async fn run(
    config: OverlyricConfig,
    spotify: SpotifyProviderConfig,
    cancel: CancellationToken,
) -> Result<EngineExit, CoreError> {
    let probe: Arc<dyn MediaPlayerProbe> = Arc::new(OsascriptProbe::new(spotify.application.as_str()));

    let auth = Arc::new(AuthManager::new(
        TokenStore::new(overlyric_core::token_path()),
        Arc::new(BrowserCapture::new(&spotify, overlyric_core::extension_dir())?),
    ));

    if config.auth.force_refresh_on_start {
        info!("Refreshing bearer token on request");
        tokio::select! {
            () = cancel.cancelled() => return Ok(EngineExit::Cancelled),
            result = auth.obtain(true) => { result?; }
        }
    }

    let store = Arc::new(FileLyricsStore::open(config.lyrics.cache_dir()).await?);
    let service = Arc::new(SpotifyLyricsService::new(
        spotify.lyrics_api_url.as_str(),
        Duration::from_secs(spotify.request_timeout_secs),
        spotify.max_retries,
    )?);

    let fetcher = LyricsFetcher::new(
        store,
        probe.clone(),
        service,
        auth.clone(),
        CachePolicy {
            cache_unknown_errors: config.lyrics.cache_unknown_errors,
        },
    );

    let engine = SyncEngine::new(
        probe,
        fetcher,
        auth,
        Arc::new(TerminalSink::stdout()),
        &config.sync,
    );

    Ok(engine.run(cancel).await)
}

fn check_file_logging_enabled() -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(OverlyricConfig::config_path()) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Console logs go to stderr; stdout belongs to the lyric line
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest_retry=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = overlyric_core::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
