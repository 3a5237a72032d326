use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Missing required config field: {field}")]
    ConfigMissingField { field: String },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    // Collaborator errors
    #[error("Media player query failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("Authorization failed: {0}")]
    Auth(#[from] AuthError),

    // Persistence errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // Network errors
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Network request failed: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
}

/// Failure of a single media player query.
///
/// Never fatal: the slow cycle logs it, abandons the current iteration and
/// tries again on the next tick.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Query contains a single quote: {query}")]
    UnsafeQuery { query: String },

    #[error("Failed to run player query '{query}': {source}")]
    Spawn {
        query: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Player query '{query}' failed: {stderr}")]
    CommandFailed { query: String, stderr: String },

    #[error("Unexpected player state '{value}'")]
    UnexpectedState { value: String },

    #[error("Player query '{query}' returned a non-numeric value '{value}'")]
    InvalidNumber { query: String, value: String },
}

/// Failure to obtain a bearer token. Fatal to the `obtain` call that raised it.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Bearer token capture failed: {reason}")]
    Capture { reason: String },

    #[error("Bearer token file error: {0}")]
    TokenIo(#[from] std::io::Error),

    #[error("Bearer token file is malformed: {0}")]
    TokenFormat(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
