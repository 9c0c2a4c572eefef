// ── Runtime session configuration ──
//
// Describes *how* to reach a controller. Never touches disk: the CLI
// (via hermes-config) builds a `SessionConfig` and hands it in.

use std::time::Duration;

use hermes_link::ReconnectConfig;
use url::Url;

use crate::error::CoreError;

/// Default controller endpoint when nothing is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:9999/";

/// Configuration for one session with one controller.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Controller WebSocket endpoint (`ws://` or `wss://`).
    pub url: Url,
    /// Backoff and retry budget for reconnection.
    pub reconnect: ReconnectConfig,
    /// How long `Session::connect` waits for the first connection.
    /// `None` returns immediately and lets the link connect in the background.
    pub connect_timeout: Option<Duration>,
    /// Send a keepalive ping at this interval while connected.
    pub ping_interval: Option<Duration>,
}

impl SessionConfig {
    /// Build a config for `endpoint`, validating the scheme.
    pub fn new(endpoint: &str) -> Result<Self, CoreError> {
        Ok(Self {
            url: hermes_link::parse_endpoint(endpoint)?,
            ..Self::default()
        })
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            reconnect: ReconnectConfig::default(),
            connect_timeout: Some(Duration::from_secs(10)),
            ping_interval: None,
        }
    }
}
