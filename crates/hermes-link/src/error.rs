use thiserror::Error;

/// Top-level error type for the `hermes-link` crate.
///
/// Covers every failure mode of the controller link: endpoint parsing,
/// WebSocket handshake, remote close, and frame encoding.
/// `hermes-core` maps these into session-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Endpoint ────────────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The URL parsed but is not a WebSocket endpoint.
    #[error("Unsupported URL scheme '{scheme}' (expected ws or wss)")]
    UnsupportedScheme { scheme: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection or upgrade failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed by the controller.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// Retry budget exhausted; the link will not reconnect on its own.
    #[error("Gave up reconnecting after {attempts} attempts")]
    GivenUp { attempts: u32 },

    // ── Data ────────────────────────────────────────────────────────
    /// Outbound message could not be serialized.
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::WebSocketConnect(_) | Self::WebSocketClosed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_and_close_errors_are_transient() {
        assert!(Error::WebSocketConnect("refused".into()).is_transient());
        assert!(
            Error::WebSocketClosed {
                code: 1006,
                reason: "abnormal".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn terminal_errors_are_not_transient() {
        assert!(!Error::GivenUp { attempts: 3 }.is_transient());
        assert!(
            !Error::UnsupportedScheme {
                scheme: "http".into()
            }
            .is_transient()
        );
    }
}
