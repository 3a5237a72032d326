//! Path constants for configuration, token and lyrics files.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "overlyric";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the persisted bearer token file
pub const TOKEN_FILE_NAME: &str = "token.json";

/// The name of the lyrics directory (one JSON file per track)
pub const LYRICS_DIR_NAME: &str = "lyrics";

/// The name of the directory the token forwarder extension is written to
pub const EXTENSION_DIR_NAME: &str = "extension";

/// The name of the log file written when file logging is enabled
pub const LOG_FILE_NAME: &str = "overlyric.log";

/// Get the configuration directory path (~/.config/overlyric/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/overlyric/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the bearer token path (~/.config/overlyric/token.json)
#[must_use]
pub fn token_path() -> PathBuf {
    config_dir().join(TOKEN_FILE_NAME)
}

/// Get the default lyrics directory (~/.config/overlyric/lyrics/)
#[must_use]
pub fn lyrics_dir() -> PathBuf {
    config_dir().join(LYRICS_DIR_NAME)
}

/// Get the log file path (~/.config/overlyric/overlyric.log)
#[must_use]
pub fn log_file_path() -> PathBuf {
    config_dir().join(LOG_FILE_NAME)
}

/// Get the token forwarder extension directory (~/.config/overlyric/extension/)
#[must_use]
pub fn extension_dir() -> PathBuf {
    config_dir().join(EXTENSION_DIR_NAME)
}
