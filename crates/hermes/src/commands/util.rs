//! Shared helpers for command handlers.

use std::time::Duration;

use hermes_core::{EntityId, LinkEvent, ServerEvent, Session};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;

use crate::error::CliError;

/// Parse an entity id argument.
pub fn parse_id(field: &str, raw: &str) -> Result<EntityId, CliError> {
    raw.trim().parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("expected a numeric id, got '{raw}'"),
    })
}

/// Parse a command value: JSON when it parses, else a bare string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

/// Wait until the controller has pushed its first full snapshot.
///
/// Bounded by the session's connect timeout when one is configured.
pub async fn wait_for_snapshot(session: &Session) -> Result<(), CliError> {
    let mut events = session.subscribe_events();
    if session.store().last_handshake().is_some() {
        return Ok(());
    }

    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) => match &*event {
                    LinkEvent::Message(ServerEvent::Handshake(_)) => return Ok(()),
                    LinkEvent::GivenUp { attempts } => {
                        return Err(CliError::ConnectionLost {
                            attempts: *attempts,
                        });
                    }
                    _ => {}
                },
                Err(RecvError::Lagged(_)) => {
                    if session.store().last_handshake().is_some() {
                        return Ok(());
                    }
                }
                Err(RecvError::Closed) => return Err(CliError::NotConnected),
            }
        }
    };

    match session.config().connect_timeout {
        Some(limit) => tokio::time::timeout(limit, wait)
            .await
            .map_err(|_| timeout_error(limit, "the controller snapshot"))?,
        None => wait.await,
    }
}

pub fn timeout_error(limit: Duration, what: &str) -> CliError {
    CliError::Timeout {
        seconds: limit.as_secs(),
        what: what.into(),
    }
}

/// `name`, or `-` when absent.
pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_fall_back_to_strings() {
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("90"), json!(90));
        assert_eq!(parse_value("\"on\""), json!("on"));
        assert_eq!(parse_value("blink"), json!("blink"));
    }

    #[test]
    fn ids_must_be_numeric() {
        assert_eq!(parse_id("device", " 7 ").ok(), Some(EntityId::new(7)));
        assert!(matches!(
            parse_id("device", "lamp"),
            Err(CliError::Validation { .. })
        ));
    }
}
