//! Lyric documents and active-line resolution.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Placeholder the lyrics service emits for instrumental gaps
pub const MUSICAL_NOTE: &str = "♪";

/// A single lyric line.
///
/// Serialized with the service's field names (`startTimeMs` as a string), so
/// cached files look like the payload they were built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    #[serde(
        rename = "startTimeMs",
        default,
        serialize_with = "serialize_time_tag",
        deserialize_with = "deserialize_time_tag"
    )]
    pub time_tag_ms: Option<u64>,
    pub words: String,
}

impl LyricLine {
    pub fn new(time_tag_ms: Option<u64>, words: impl Into<String>) -> Self {
        Self {
            time_tag_ms,
            words: words.into(),
        }
    }

    /// Line text prepared for display: quotes and line breaks removed, a bare
    /// musical note mapped to nothing.
    #[must_use]
    pub fn display_text(&self) -> String {
        sanitize(&self.words)
    }
}

/// Strip characters the display cannot take verbatim.
#[must_use]
pub fn sanitize(words: &str) -> String {
    if words.trim() == MUSICAL_NOTE {
        return String::new();
    }
    words
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | '\n' | '\r'))
        .collect()
}

#[allow(clippy::ref_option)]
fn serialize_time_tag<S: Serializer>(tag: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    match tag {
        Some(ms) => serializer.serialize_str(&ms.to_string()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_time_tag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTag {
        Number(u64),
        Text(String),
    }

    match Option::<RawTag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawTag::Number(ms)) => Ok(Some(ms)),
        Some(RawTag::Text(text)) => text
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// How a document's lines relate to playback time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncType {
    /// Every line carries its own start tag
    #[serde(rename = "LINE_SYNCED", alias = "SYLLABLE_SYNCED")]
    LineSynced,
    /// Lines are spread proportionally over the track duration
    #[serde(rename = "UNSYNCED")]
    Unsynced,
}

impl SyncType {
    /// Parse the service's `syncType` literal
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "LINE_SYNCED" | "SYLLABLE_SYNCED" => Some(Self::LineSynced),
            "UNSYNCED" => Some(Self::Unsynced),
            _ => None,
        }
    }
}

/// Classification of a failed lyrics fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// The service rejected the bearer token
    Unauthorized,
    /// The service has no lyrics for the track
    NotFound,
    /// Any other non-success response
    Unknown,
    /// The request never produced a response
    Network,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not found",
            Self::Unknown => "unknown",
            Self::Network => "network",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

/// Lyrics for one (artist, song) pair, or the reason there are none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LyricsDocument {
    Document {
        artist: String,
        song: String,
        #[serde(rename = "syncType")]
        sync_type: SyncType,
        lines: Vec<LyricLine>,
    },
    Error {
        artist: String,
        song: String,
        error: FetchError,
    },
}

impl LyricsDocument {
    /// Build a document, ordering synced lines by their start tag.
    pub fn document(
        artist: impl Into<String>,
        song: impl Into<String>,
        sync_type: SyncType,
        mut lines: Vec<LyricLine>,
    ) -> Self {
        if sync_type == SyncType::LineSynced {
            lines.sort_by_key(|line| line.time_tag_ms.unwrap_or(0));
        }
        Self::Document {
            artist: artist.into(),
            song: song.into(),
            sync_type,
            lines,
        }
    }

    pub fn error(
        artist: impl Into<String>,
        song: impl Into<String>,
        kind: FetchErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Error {
            artist: artist.into(),
            song: song.into(),
            error: FetchError {
                kind,
                message: message.into(),
            },
        }
    }

    /// Error kind, if this is an error record
    #[must_use]
    pub const fn error_kind(&self) -> Option<FetchErrorKind> {
        match self {
            Self::Error { error, .. } => Some(error.kind),
            Self::Document { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Index of the line to show at `position_secs`, or `None` when nothing is active.
///
/// Unsynced lines are spread evenly over `duration_secs`; positions outside
/// `[0, duration)` select nothing. Synced lines become active `lookahead_ms`
/// before their tag; the last line stays active past its tag with no upper bound.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn active_line_index(
    sync_type: SyncType,
    lines: &[LyricLine],
    position_secs: f64,
    duration_secs: f64,
    lookahead_ms: u64,
) -> Option<usize> {
    match sync_type {
        SyncType::Unsynced => {
            if duration_secs <= 0.0 {
                return None;
            }
            let ratio = position_secs / duration_secs;
            if !(0.0..1.0).contains(&ratio) {
                return None;
            }
            let index = (lines.len() as f64 * ratio).floor() as usize;
            (index < lines.len()).then_some(index)
        }
        SyncType::LineSynced => {
            let threshold_ms = position_secs.mul_add(1000.0, lookahead_ms as f64);
            let next = lines
                .partition_point(|line| (line.time_tag_ms.unwrap_or(0) as f64) < threshold_ms);
            next.checked_sub(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synced(tags: &[(u64, &str)]) -> Vec<LyricLine> {
        tags.iter()
            .map(|(ms, words)| LyricLine::new(Some(*ms), *words))
            .collect()
    }

    fn unsynced(words: &[&str]) -> Vec<LyricLine> {
        words.iter().map(|w| LyricLine::new(None, *w)).collect()
    }

    #[test]
    fn test_synced_resolves_preceding_line() {
        let lines = synced(&[(0, "a"), (1000, "b"), (5000, "c")]);
        let index = active_line_index(SyncType::LineSynced, &lines, 2.0, 200.0, 100);
        assert_eq!(index.map(|i| lines[i].words.as_str()), Some("b"));
    }

    #[test]
    fn test_synced_before_first_tag() {
        let lines = synced(&[(3000, "a"), (6000, "b")]);
        assert_eq!(active_line_index(SyncType::LineSynced, &lines, 1.0, 200.0, 100), None);
    }

    #[test]
    fn test_synced_lookahead_switches_early() {
        let lines = synced(&[(0, "a"), (1000, "b")]);
        // 0.95s + 100ms lookahead crosses the 1000ms tag
        assert_eq!(active_line_index(SyncType::LineSynced, &lines, 0.95, 10.0, 100), Some(1));
        assert_eq!(active_line_index(SyncType::LineSynced, &lines, 0.85, 10.0, 100), Some(0));
    }

    #[test]
    fn test_synced_tag_equal_to_threshold_is_not_yet_active() {
        let lines = synced(&[(0, "a"), (1000, "b")]);
        // 0.5s + 500ms and 0s + 1000ms both land exactly on the 1000ms tag
        assert_eq!(active_line_index(SyncType::LineSynced, &lines, 0.5, 10.0, 500), Some(0));
        assert_eq!(active_line_index(SyncType::LineSynced, &lines, 0.0, 10.0, 1000), Some(0));
        assert_eq!(active_line_index(SyncType::LineSynced, &lines, 0.501, 10.0, 500), Some(1));

        let first_only = synced(&[(1000, "a")]);
        assert_eq!(active_line_index(SyncType::LineSynced, &first_only, 0.5, 10.0, 500), None);
    }

    #[test]
    fn test_synced_past_last_tag_keeps_last_line() {
        let lines = synced(&[(0, "a"), (1000, "b")]);
        assert_eq!(active_line_index(SyncType::LineSynced, &lines, 500.0, 10.0, 100), Some(1));
    }

    #[test]
    fn test_synced_matches_last_line_before_threshold() {
        let lines = synced(&[(0, "a"), (1200, "b"), (2500, "c"), (4100, "d"), (9000, "e")]);
        for tenths in 0..120_u32 {
            let position = f64::from(tenths) / 10.0 + 0.03;
            let threshold = position * 1000.0 + 100.0;
            let expected = lines
                .iter()
                .rposition(|l| (l.time_tag_ms.unwrap_or(0) as f64) < threshold);
            assert_eq!(
                active_line_index(SyncType::LineSynced, &lines, position, 20.0, 100),
                expected,
                "position {position}"
            );
        }
    }

    #[test]
    fn test_unsynced_proportional_index() {
        let lines = unsynced(&["l0", "l1", "l2", "l3"]);
        let index = active_line_index(SyncType::Unsynced, &lines, 150.0, 200.0, 100);
        assert_eq!(index.map(|i| lines[i].words.as_str()), Some("l3"));
        assert_eq!(active_line_index(SyncType::Unsynced, &lines, 0.0, 200.0, 100), Some(0));
        assert_eq!(active_line_index(SyncType::Unsynced, &lines, 49.9, 200.0, 100), Some(0));
        assert_eq!(active_line_index(SyncType::Unsynced, &lines, 50.0, 200.0, 100), Some(1));
    }

    #[test]
    fn test_unsynced_out_of_range() {
        let lines = unsynced(&["l0", "l1"]);
        assert_eq!(active_line_index(SyncType::Unsynced, &lines, 200.0, 200.0, 100), None);
        assert_eq!(active_line_index(SyncType::Unsynced, &lines, 250.0, 200.0, 100), None);
        assert_eq!(active_line_index(SyncType::Unsynced, &lines, -1.0, 200.0, 100), None);
        assert_eq!(active_line_index(SyncType::Unsynced, &lines, 10.0, 0.0, 100), None);
    }

    #[test]
    fn test_unsynced_empty_document() {
        assert_eq!(active_line_index(SyncType::Unsynced, &[], 10.0, 200.0, 100), None);
        assert_eq!(active_line_index(SyncType::LineSynced, &[], 10.0, 200.0, 100), None);
    }

    #[test]
    fn test_document_sorts_synced_lines() {
        let doc = LyricsDocument::document(
            "Artist",
            "Song",
            SyncType::LineSynced,
            synced(&[(5000, "c"), (0, "a"), (1000, "b")]),
        );
        let LyricsDocument::Document { lines, .. } = doc else {
            panic!("expected document");
        };
        let words: Vec<_> = lines.iter().map(|l| l.words.as_str()).collect();
        assert_eq!(words, ["a", "b", "c"]);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Don't \"stop\"\nnow\r"), "Dont stopnow");
        assert_eq!(sanitize("♪"), "");
        assert_eq!(sanitize("♪ la la ♪"), "♪ la la ♪");
    }

    #[test]
    fn test_line_accepts_string_and_number_tags() {
        let line: LyricLine =
            serde_json::from_str(r#"{"startTimeMs":"1500","words":"x","endTimeMs":"0"}"#).unwrap();
        assert_eq!(line.time_tag_ms, Some(1500));

        let line: LyricLine = serde_json::from_str(r#"{"startTimeMs":1500,"words":"x"}"#).unwrap();
        assert_eq!(line.time_tag_ms, Some(1500));

        let line: LyricLine = serde_json::from_str(r#"{"words":"x"}"#).unwrap();
        assert_eq!(line.time_tag_ms, None);
    }

    #[test]
    fn test_error_document_json_shape() {
        let doc = LyricsDocument::error("A", "S", FetchErrorKind::Unknown, "HTTP 500: oops");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["artist"], "A");
        assert_eq!(json["error"]["kind"], "unknown");

        let back: LyricsDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
        assert_eq!(back.error_kind(), Some(FetchErrorKind::Unknown));
    }

    #[test]
    fn test_sync_type_from_wire() {
        assert_eq!(SyncType::from_wire("LINE_SYNCED"), Some(SyncType::LineSynced));
        assert_eq!(SyncType::from_wire("SYLLABLE_SYNCED"), Some(SyncType::LineSynced));
        assert_eq!(SyncType::from_wire("UNSYNCED"), Some(SyncType::Unsynced));
        assert_eq!(SyncType::from_wire("WORD_SYNCED"), None);
    }
}
