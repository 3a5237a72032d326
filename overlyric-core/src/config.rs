use crate::error::{CoreError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlyricConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Provider-specific tables, parsed by the crate that owns each provider
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Timing of the two engine cycles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay between the end of one player poll and the start of the next
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Fixed period of the line render timer
    #[serde(default = "default_render_interval")]
    pub render_interval_ms: u64,
    /// Bias added to the playback cursor when matching synced line tags
    #[serde(default = "default_lookahead")]
    pub lookahead_ms: u64,
}

const fn default_poll_interval() -> u64 {
    5000
}

const fn default_render_interval() -> u64 {
    100
}

const fn default_lookahead() -> u64 {
    100
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            render_interval_ms: default_render_interval(),
            lookahead_ms: default_lookahead(),
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }

    /// Reject intervals that would turn a cycle into a busy loop.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] if either interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "sync.poll_interval_ms must be greater than zero".into(),
            });
        }
        if self.render_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "sync.render_interval_ms must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Directory holding one `<artist> - <song>.json` file per track
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Persist non-401/404 fetch failures so they stick until the track changes
    #[serde(default = "default_true")]
    pub cache_unknown_errors: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            cache_unknown_errors: true,
        }
    }
}

impl LyricsConfig {
    /// Configured lyrics directory, or `~/.config/overlyric/lyrics/`
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(crate::paths::lyrics_dir)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Discard the persisted bearer token and capture a new one at startup
    #[serde(default)]
    pub force_refresh_on_start: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to ~/.config/overlyric/overlyric.log
    #[serde(default)]
    pub enabled: bool,
}

/// Raw `[providers.*]` tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvidersConfig(toml::Table);

impl ProvidersConfig {
    /// Deserialize the `[providers.<name>]` table, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the table exists but does not match `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.0
            .get(name)
            .cloned()
            .map(|value| {
                value.try_into().map_err(|e: toml::de::Error| CoreError::ConfigInvalid {
                    message: format!("providers.{name}: {e}"),
                })
            })
            .transpose()
    }
}

impl OverlyricConfig {
    /// Get the config file path (~/.config/overlyric/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from file, writing the template on first run.
    ///
    /// Every field has a default, so a freshly written template loads as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, written or parsed.
    pub fn load_or_create(provider_templates: Option<&[&str]>) -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&config_path, build_config_template(provider_templates))?;
            info!("Wrote config template to {:?}", config_path);
        }

        let content = fs::read_to_string(&config_path)?;
        let config = Self::parse(&content).map_err(|source| CoreError::ConfigParseError {
            path: config_path,
            source,
        })?;
        config.sync.validate()?;

        Ok(config)
    }

    /// Parse config from a TOML string
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the content is not a valid config.
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Build the full config template: the core sections followed by each provider's section.
#[must_use]
pub fn build_config_template(provider_templates: Option<&[&str]>) -> String {
    let mut template = String::from(CONFIG_TEMPLATE);
    for provider in provider_templates.unwrap_or_default() {
        template.push('\n');
        template.push_str(provider);
    }
    template
}

const CONFIG_TEMPLATE: &str = const_format::concatcp!(
    r#"# Overlyric Configuration
# ~/.config/"#,
    crate::paths::CONFIG_DIR_NAME,
    "/",
    crate::paths::CONFIG_FILE_NAME,
    r#"

[sync]
# Delay between player polls, counted from the end of the previous poll
poll_interval_ms = 5000
# Render timer period
render_interval_ms = 100
# Synced lines switch this many milliseconds early
lookahead_ms = 100

[lyrics]
# Defaults to ~/.config/overlyric/lyrics
# cache_dir = ""
# Keep unexpected service failures cached until the track changes
cache_unknown_errors = true

[auth]
# Discard the saved bearer token and capture a new one at startup
force_refresh_on_start = false

[logging]
# Also write logs to ~/.config/overlyric/overlyric.log
enabled = false
"#
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config = OverlyricConfig::parse(&build_config_template(None)).unwrap();
        assert_eq!(config.sync.poll_interval_ms, 5000);
        assert_eq!(config.sync.render_interval_ms, 100);
        assert_eq!(config.sync.lookahead_ms, 100);
        assert!(config.lyrics.cache_unknown_errors);
        assert!(!config.auth.force_refresh_on_start);
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = OverlyricConfig::parse("").unwrap();
        assert_eq!(config.sync.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.sync.render_interval(), Duration::from_millis(100));
        assert_eq!(config.lyrics.cache_dir(), crate::paths::lyrics_dir());
    }

    #[test]
    fn test_cache_dir_override() {
        let config = OverlyricConfig::parse("[lyrics]\ncache_dir = \"/tmp/lyrics\"\n").unwrap();
        assert_eq!(config.lyrics.cache_dir(), PathBuf::from("/tmp/lyrics"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = OverlyricConfig::parse("[sync]\nrender_interval_ms = 0\n").unwrap();
        assert!(matches!(
            config.sync.validate(),
            Err(CoreError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn test_provider_table_lookup() {
        #[derive(Debug, Deserialize)]
        struct Example {
            url: String,
        }

        let config =
            OverlyricConfig::parse("[providers.example]\nurl = \"https://example.com\"\n")
                .unwrap();

        let example: Option<Example> = config.providers.get("example").unwrap();
        assert_eq!(example.unwrap().url, "https://example.com");

        let missing: Option<Example> = config.providers.get("missing").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_provider_table_type_mismatch() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Example {
            url: String,
        }

        let config = OverlyricConfig::parse("[providers.example]\nurl = 3\n").unwrap();
        let result: Result<Option<Example>> = config.providers.get("example");
        assert!(matches!(result, Err(CoreError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_template_includes_provider_sections() {
        let template = build_config_template(Some(&["[providers.example]\nurl = \"x\"\n"]));
        assert!(template.contains("[sync]"));
        assert!(template.contains("[providers.example]"));
    }
}
