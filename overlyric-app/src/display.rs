use async_trait::async_trait;
use overlyric_core::{DisplaySink, DisplayUpdate};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::warn;

/// Erase the current terminal line and return to its start
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Marks lines the player has no timing for
const UNSYNCED_PREFIX: &str = "~ ";

/// Single-line terminal display that redraws in place.
///
/// Logs go to stderr, so the line stays put on stdout.
pub struct TerminalSink<W> {
    out: Mutex<W>,
    alive: AtomicBool,
}

impl TerminalSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            alive: AtomicBool::new(true),
        }
    }
}

fn render(update: &DisplayUpdate) -> String {
    if update.text.is_empty() {
        CLEAR_LINE.to_string()
    } else if update.unsynced {
        format!("{CLEAR_LINE}{UNSYNCED_PREFIX}{}", update.text)
    } else {
        format!("{CLEAR_LINE}{}", update.text)
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> DisplaySink for TerminalSink<W> {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn write(&self, update: DisplayUpdate) {
        let mut out = self.out.lock().await;
        let result = async {
            out.write_all(render(&update).as_bytes()).await?;
            out.flush().await
        }
        .await;

        if let Err(e) = result {
            warn!("Display output closed: {}", e);
            self.alive.store(false, Ordering::SeqCst);
        }
    }
}
