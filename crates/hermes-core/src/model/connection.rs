// ── Connection status ──
//
// Process-wide view of the controller link. Written only by the session;
// read by everything else through a `watch` channel.

use serde::{Deserialize, Serialize};

/// Settings of one controller-side server (`server` or `web` section).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Current link status plus the controller configuration learned from the
/// last handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub server: Option<ServerSettings>,
    pub web: Option<ServerSettings>,
}

impl ConnectionStatus {
    pub fn disconnected() -> Self {
        Self::default()
    }
}
