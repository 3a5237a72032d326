use crate::error::Result;
use crate::lyrics::LyricsDocument;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Persistence of lyric documents and cached errors, keyed by (artist, song)
#[async_trait]
pub trait LyricsStore: Send + Sync {
    /// Look up a record; `Ok(None)` is a miss.
    async fn get(&self, artist: &str, song: &str) -> Result<Option<LyricsDocument>>;

    /// Insert or replace the record for (artist, song).
    async fn put(&self, artist: &str, song: &str, document: &LyricsDocument) -> Result<()>;
}

/// One pretty-printed JSON file per track, named `<artist> - <song>.json`
pub struct FileLyricsStore {
    dir: PathBuf,
}

impl FileLyricsStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        info!("Opening lyrics store at {:?}", dir);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// File holding the record for (artist, song)
    #[must_use]
    pub fn record_path(&self, artist: &str, song: &str) -> PathBuf {
        self.dir
            .join(format!("{} - {}.json", file_safe(artist), file_safe(song)))
    }
}

/// Keep names inside the store directory
fn file_safe(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

#[async_trait]
impl LyricsStore for FileLyricsStore {
    async fn get(&self, artist: &str, song: &str) -> Result<Option<LyricsDocument>> {
        let path = self.record_path(artist, song);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No stored lyrics for {} - {}", artist, song);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(document) => {
                info!("Loaded lyrics for {} - {}", artist, song);
                Ok(Some(document))
            }
            Err(e) => {
                // Treated as a miss; the next successful fetch overwrites it
                warn!("Ignoring malformed lyrics file {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    async fn put(&self, artist: &str, song: &str, document: &LyricsDocument) -> Result<()> {
        let path = self.record_path(artist, song);
        let content = serde_json::to_string_pretty(document)?;
        tokio::fs::write(&path, content).await?;
        debug!("Stored lyrics for {} - {} at {:?}", artist, song, path);
        Ok(())
    }
}
