//! In-memory collaborators shared by the unit tests.

use crate::auth::{AuthToken, CredentialCapture};
use crate::display::{DisplaySink, DisplayUpdate};
use crate::error::{AuthError, CoreError, ProbeError, Result};
use crate::lyrics::LyricsDocument;
use crate::probe::{MediaPlayerProbe, PlayerQuery};
use crate::service::{LyricsService, ServiceResponse};
use crate::store::LyricsStore;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Player whose answers are set per query and can change between calls
#[derive(Default)]
pub struct ScriptedProbe {
    responses: Mutex<HashMap<PlayerQuery, std::result::Result<String, String>>>,
    calls: AtomicUsize,
    latency: Duration,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, query: PlayerQuery, value: &str) -> Self {
        self.set(query, value);
        self
    }

    /// Make every query take `latency` of (tokio) time to answer
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set(&self, query: PlayerQuery, value: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(query, Ok(value.to_string()));
    }

    /// Make `query` fail as if the player printed `stderr`
    pub fn fail(&self, query: PlayerQuery, stderr: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(query, Err(stderr.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaPlayerProbe for ScriptedProbe {
    async fn query(&self, query: PlayerQuery) -> std::result::Result<String, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let response = self.responses.lock().unwrap().get(&query).cloned();
        match response {
            Some(Ok(value)) => Ok(value),
            Some(Err(stderr)) => Err(ProbeError::CommandFailed {
                query: query.to_string(),
                stderr,
            }),
            None => Err(ProbeError::CommandFailed {
                query: query.to_string(),
                stderr: "no response scripted".to_string(),
            }),
        }
    }
}

/// Display that records every write
pub struct RecordingSink {
    writes: Mutex<Vec<DisplayUpdate>>,
    alive: AtomicBool,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            alive: AtomicBool::new(true),
        }
    }
}

impl RecordingSink {
    pub fn writes(&self) -> Vec<DisplayUpdate> {
        self.writes.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.writes().into_iter().map(|update| update.text).collect()
    }

    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl DisplaySink for RecordingSink {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn write(&self, update: DisplayUpdate) {
        self.writes.lock().unwrap().push(update);
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(String, String), LyricsDocument>>,
}

impl MemoryStore {
    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl LyricsStore for MemoryStore {
    async fn get(&self, artist: &str, song: &str) -> Result<Option<LyricsDocument>> {
        let key = (artist.to_string(), song.to_string());
        Ok(self.records.lock().unwrap().get(&key).cloned())
    }

    async fn put(&self, artist: &str, song: &str, document: &LyricsDocument) -> Result<()> {
        let key = (artist.to_string(), song.to_string());
        self.records.lock().unwrap().insert(key, document.clone());
        Ok(())
    }
}

/// Service answering from a queue; an empty queue behaves like a dropped connection
pub struct StubService {
    responses: Mutex<VecDeque<ServiceResponse>>,
    requests: Mutex<Vec<(String, String)>>,
}

impl StubService {
    pub fn new(responses: Vec<ServiceResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn track_ids(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, token)| token.clone())
            .collect()
    }
}

#[async_trait]
impl LyricsService for StubService {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn request(&self, track_id: &str, token: &AuthToken) -> Result<ServiceResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((track_id.to_string(), token.value.clone()));
        self.responses.lock().unwrap().pop_front().ok_or_else(|| {
            CoreError::IoError(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))
        })
    }
}

/// Capture handing out queued tokens and counting how often it ran
pub struct CountingCapture {
    tokens: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
    never_completes: bool,
}

impl CountingCapture {
    pub fn new<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            tokens: Mutex::new(tokens.into_iter().map(String::from).collect()),
            calls: AtomicUsize::new(0),
            never_completes: false,
        }
    }

    pub fn failing() -> Self {
        Self::new([])
    }

    /// A capture the user never completes
    pub fn pending() -> Self {
        Self {
            never_completes: true,
            ..Self::failing()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialCapture for CountingCapture {
    async fn capture(&self) -> std::result::Result<String, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.never_completes {
            return std::future::pending().await;
        }
        self.tokens
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AuthError::Capture {
                reason: "capture window closed".to_string(),
            })
    }
}
