//! Client for Spotify's unofficial color-lyrics endpoint.
//!
//! **WARNING:** This endpoint is what the web player uses internally. It needs the
//! web player's bearer token and may violate Spotify's Terms of Service.
//! Use at your own risk.

use std::time::Duration;

use async_trait::async_trait;
use overlyric_core::{AuthToken, CoreError, LyricsService, RemoteLyrics, ServiceResponse};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "overlyric::lyrics::spotify";

pub struct SpotifyLyricsService {
    base_url: String,
    client: ClientWithMiddleware,
}

impl SpotifyLyricsService {
    /// Create a client for `base_url` (the track ID is appended as a path segment).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>, timeout: Duration, max_retries: u32) -> Result<Self, CoreError> {
        warn!(
            target: LOG_TARGET,
            "Using the unofficial Spotify lyrics API. This may violate Spotify's Terms of Service."
        );

        let base_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn track_url(&self, track_id: &str) -> String {
        format!("{}/{track_id}?format=json", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct LyricsPayload {
    lyrics: RemoteLyrics,
}

/// Map a received response onto the service outcome
fn classify(status: StatusCode, body: String) -> ServiceResponse {
    match status {
        StatusCode::OK => match serde_json::from_str::<LyricsPayload>(&body) {
            Ok(payload) => ServiceResponse::Found(payload.lyrics),
            Err(e) => ServiceResponse::Failed {
                status: status.as_u16(),
                body: format!("malformed lyrics payload: {e}"),
            },
        },
        StatusCode::UNAUTHORIZED => ServiceResponse::Unauthorized,
        StatusCode::NOT_FOUND => ServiceResponse::NotFound,
        other => ServiceResponse::Failed {
            status: other.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl LyricsService for SpotifyLyricsService {
    fn name(&self) -> &'static str {
        "spotify_lyrics"
    }

    async fn request(&self, track_id: &str, token: &AuthToken) -> Result<ServiceResponse, CoreError> {
        let url = self.track_url(track_id);
        debug!(target: LOG_TARGET, "Spotify GET: {}", url);

        let response = self
            .client
            .get(&url)
            .header("authorization", &token.value)
            .header("app-platform", "WebPlayer")
            .send()
            .await?;

        let status = response.status();
        info!(target: LOG_TARGET, "Spotify response status: {}", status);
        let body = response.text().await?;

        Ok(classify(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::Router;
    use overlyric_core::LyricLine;

    const PAYLOAD: &str = r#"{
        "lyrics": {
            "syncType": "LINE_SYNCED",
            "lines": [
                {"startTimeMs": "960", "words": "First", "syllables": [], "endTimeMs": "0"},
                {"startTimeMs": "4020", "words": "♪", "syllables": [], "endTimeMs": "0"}
            ],
            "provider": "MusixMatch"
        },
        "colors": {"background": -1}
    }"#;

    #[test]
    fn test_classify_success() {
        let ServiceResponse::Found(lyrics) = classify(StatusCode::OK, PAYLOAD.to_string()) else {
            panic!("expected lyrics");
        };
        assert_eq!(lyrics.sync_type, "LINE_SYNCED");
        assert_eq!(lyrics.lines[0], LyricLine::new(Some(960), "First"));
        assert_eq!(lyrics.lines[1].words, "♪");
    }

    #[test]
    fn test_classify_statuses() {
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, String::new()),
            ServiceResponse::Unauthorized
        ));
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, String::new()),
            ServiceResponse::NotFound
        ));
        assert!(matches!(
            classify(StatusCode::TOO_MANY_REQUESTS, "slow down".into()),
            ServiceResponse::Failed { status: 429, ref body } if body == "slow down"
        ));
    }

    #[test]
    fn test_classify_malformed_success() {
        assert!(matches!(
            classify(StatusCode::OK, "<html>".into()),
            ServiceResponse::Failed { status: 200, .. }
        ));
    }

    #[test]
    fn test_track_url() {
        let service =
            SpotifyLyricsService::new("https://example.com/color-lyrics/v2/track/", Duration::from_secs(1), 0)
                .unwrap();
        assert_eq!(
            service.track_url("abc"),
            "https://example.com/color-lyrics/v2/track/abc?format=json"
        );
    }

    async fn lyrics_handler(Path(id): Path<String>, headers: HeaderMap) -> (axum::http::StatusCode, String) {
        let authorized = headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer good")
            && headers.get("app-platform").and_then(|v| v.to_str().ok()) == Some("WebPlayer");
        match (authorized, id.as_str()) {
            (false, _) => (axum::http::StatusCode::UNAUTHORIZED, String::new()),
            (true, "abc") => (axum::http::StatusCode::OK, PAYLOAD.to_string()),
            (true, "boom") => (axum::http::StatusCode::BAD_GATEWAY, "upstream".to_string()),
            (true, _) => (axum::http::StatusCode::NOT_FOUND, String::new()),
        }
    }

    #[tokio::test]
    async fn test_request_against_local_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/track", listener.local_addr().unwrap());
        let app = Router::new().route("/track/{id}", get(lyrics_handler));
        tokio::spawn(async move { axum::serve(listener, app).await });

        let service = SpotifyLyricsService::new(base, Duration::from_secs(5), 0).unwrap();
        let good = AuthToken::new("Bearer good");

        assert!(matches!(
            service.request("abc", &good).await.unwrap(),
            ServiceResponse::Found(_)
        ));
        assert!(matches!(
            service.request("missing", &good).await.unwrap(),
            ServiceResponse::NotFound
        ));
        assert!(matches!(
            service.request("boom", &good).await.unwrap(),
            ServiceResponse::Failed { status: 502, .. }
        ));
        assert!(matches!(
            service.request("abc", &AuthToken::new("Bearer stale")).await.unwrap(),
            ServiceResponse::Unauthorized
        ));
    }
}
