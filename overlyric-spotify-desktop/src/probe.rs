use async_trait::async_trait;
use overlyric_core::{MediaPlayerProbe, PlayerQuery, ProbeError};
use tokio::process::Command;
use tracing::trace;

const LOG_TARGET: &str = "overlyric::spotify::probe";

/// Queries the desktop client through `osascript`, one process per query.
pub struct OsascriptProbe {
    application: String,
}

impl OsascriptProbe {
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
        }
    }

    /// AppleScript source for `query`.
    ///
    /// Scripts containing a single quote are refused, matching how they would
    /// break out of a shell-quoted `-e` argument.
    fn script(&self, query: PlayerQuery) -> Result<String, ProbeError> {
        let script = format!("tell application \"{}\" to {}", self.application, query.as_str());
        if script.contains('\'') {
            return Err(ProbeError::UnsafeQuery { query: script });
        }
        Ok(script)
    }
}

#[async_trait]
impl MediaPlayerProbe for OsascriptProbe {
    async fn query(&self, query: PlayerQuery) -> Result<String, ProbeError> {
        let script = self.script(query)?;
        trace!(target: LOG_TARGET, "osascript -e '{}'", script);

        let output = Command::new("osascript")
            .arg("-e")
            .arg(&script)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                query: query.to_string(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() || !stderr.trim().is_empty() {
            return Err(ProbeError::CommandFailed {
                query: query.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}
