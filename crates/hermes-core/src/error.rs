// ── Core error types ──
//
// User-facing errors from hermes-core. Consumers never see WebSocket
// frames or serde internals directly; `From<hermes_link::Error>`
// translates transport-layer errors into session-level variants.

use thiserror::Error;

use crate::model::EntityId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to controller at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Controller disconnected")]
    ControllerDisconnected,

    #[error("Gave up reconnecting to the controller after {attempts} attempts")]
    ConnectionLost { attempts: u32 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Group {group} cannot have parent {parent}: the parent chain leads back to it")]
    GroupCycle { group: EntityId, parent: EntityId },

    #[error("Invalid {entity_type} record: {message}")]
    InvalidEntity {
        entity_type: String,
        message: String,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn invalid(entity_type: &str, err: &serde_json::Error) -> Self {
        Self::InvalidEntity {
            entity_type: entity_type.to_owned(),
            message: err.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<hermes_link::Error> for CoreError {
    fn from(err: hermes_link::Error) -> Self {
        match err {
            hermes_link::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            hermes_link::Error::UnsupportedScheme { scheme } => CoreError::Config {
                message: format!("Unsupported URL scheme '{scheme}' (expected ws or wss)"),
            },
            hermes_link::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            hermes_link::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            hermes_link::Error::GivenUp { attempts } => CoreError::ConnectionLost { attempts },
            hermes_link::Error::Encode(e) => {
                CoreError::Internal(format!("Failed to encode message: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_errors_map_to_core_variants() {
        let err = CoreError::from(hermes_link::Error::UnsupportedScheme {
            scheme: "http".into(),
        });
        assert!(matches!(err, CoreError::Config { .. }));

        let err = CoreError::from(hermes_link::Error::GivenUp { attempts: 5 });
        assert!(matches!(err, CoreError::ConnectionLost { attempts: 5 }));

        let err = CoreError::from(hermes_link::Error::WebSocketConnect("refused".into()));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn group_cycle_message_names_both_ids() {
        let err = CoreError::GroupCycle {
            group: EntityId::new(2),
            parent: EntityId::new(5),
        };
        assert_eq!(
            err.to_string(),
            "Group 2 cannot have parent 5: the parent chain leads back to it"
        );
    }
}
