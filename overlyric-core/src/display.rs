use async_trait::async_trait;

/// One write to the display surface
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayUpdate {
    /// Sanitized line text; empty clears the surface
    pub text: String,
    /// Render with unsynced styling
    pub unsynced: bool,
}

impl DisplayUpdate {
    pub fn line(text: impl Into<String>, unsynced: bool) -> Self {
        Self {
            text: text.into(),
            unsynced,
        }
    }

    #[must_use]
    pub fn cleared() -> Self {
        Self::default()
    }
}

/// Surface the active lyric line is pushed to.
///
/// Receives at most one write per render tick and may be torn down at any time;
/// once [`is_alive`](Self::is_alive) returns `false` the engine stops.
#[async_trait]
pub trait DisplaySink: Send + Sync {
    fn is_alive(&self) -> bool;

    async fn write(&self, update: DisplayUpdate);
}
