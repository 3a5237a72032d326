//! Browser extension that forwards the web player's API requests to the
//! capture server.
//!
//! The extension sources live in `extension/` and target the default API host
//! and capture address. [`ForwarderExtension::new`] rewrites both for the
//! configured values, and [`ForwarderExtension::install`] writes the result to a
//! directory the browser can load unpacked.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;
use tracing::info;

use crate::capture::OBSERVE_PATH;
use crate::config::{DEFAULT_API_HOST, DEFAULT_CAPTURE_ADDR};

/// Embedded extension sources (compiled into the binary)
const MANIFEST: &str = include_str!("../extension/manifest.json");
const BACKGROUND: &str = include_str!("../extension/background.js");

pub const MANIFEST_FILE_NAME: &str = "manifest.json";
pub const BACKGROUND_FILE_NAME: &str = "background.js";

/// Host permission the bundled manifest grants for the capture server
const DEFAULT_OBSERVER_PATTERN: &str = "http://127.0.0.1/*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderExtension {
    manifest: String,
    background: String,
}

impl ForwarderExtension {
    /// Render the extension for `api_host`, posting to the server on `capture_addr`
    #[must_use]
    pub fn new(api_host: &str, capture_addr: SocketAddr) -> Self {
        let target = reachable(capture_addr);
        let host = match target.ip() {
            IpAddr::V4(ip) => ip.to_string(),
            IpAddr::V6(ip) => format!("[{ip}]"),
        };

        Self {
            manifest: MANIFEST
                .replace(DEFAULT_API_HOST, api_host)
                .replace(DEFAULT_OBSERVER_PATTERN, &format!("http://{host}/*")),
            background: BACKGROUND.replace(DEFAULT_API_HOST, api_host).replace(
                &format!("http://{DEFAULT_CAPTURE_ADDR}{OBSERVE_PATH}"),
                &format!("http://{target}{OBSERVE_PATH}"),
            ),
        }
    }

    /// Write the extension into `dir`, replacing any previous copy
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or either file cannot be written.
    pub async fn install(&self, dir: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(MANIFEST_FILE_NAME), &self.manifest).await?;
        tokio::fs::write(dir.join(BACKGROUND_FILE_NAME), &self.background).await?;
        info!("Wrote token forwarder extension to {:?}", dir);
        Ok(())
    }
}

/// The browser cannot post to a wildcard bind address
fn reachable(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => SocketAddr::new(Ipv4Addr::LOCALHOST.into(), addr.port()),
        IpAddr::V6(ip) if ip.is_unspecified() => SocketAddr::new(Ipv6Addr::LOCALHOST.into(), addr.port()),
        _ => addr,
    }
}
