pub mod capture;
pub mod config;
pub mod extension;
pub mod probe;

pub use capture::{BrowserCapture, ObservedRequest};
pub use config::{CONFIG_TEMPLATE as SPOTIFY_CONFIG_TEMPLATE, PROVIDER_NAME, SpotifyProviderConfig};
pub use extension::ForwarderExtension;
pub use probe::OsascriptProbe;
