//! Wire protocol spoken with the hardware controller.
//!
//! Every frame is a JSON text message of the shape
//! `{ "event": "<name>", "data": { ... } }`. Entity payloads are kept as raw
//! [`serde_json::Value`]s here; `hermes-core` converts them into its domain
//! model so that a controller running newer firmware never makes a frame
//! undecodable just because it added a field.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

// ── Inbound ──────────────────────────────────────────────────────────

/// Full state dump pushed by the controller after a `handshake` request.
///
/// Boards and devices are keyed by their id rendered as a string, which is
/// how the controller serializes its own maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// Global controller configuration (`server` / `web` sections).
    #[serde(default)]
    pub config: Value,

    /// Loaded robot profile (`name`, `description`).
    #[serde(default)]
    pub profile: Value,

    #[serde(default)]
    pub boards: BTreeMap<String, Value>,

    #[serde(default)]
    pub devices: BTreeMap<String, Value>,

    #[serde(default)]
    pub groups: Vec<Value>,
}

/// A message received from the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Complete snapshot of boards, devices, groups and configuration.
    Handshake(HandshakePayload),

    /// Field-level update of a single device.
    Patch { device_id: u64, patch: Value },

    /// Board announced or updated (whole record).
    Board { board: Value },

    /// Board disconnected or removed by the controller.
    BoardRemoved { board_id: u64 },

    /// Device removed by the controller.
    DeviceRemoved { device_id: u64 },

    /// Replacement of the whole group tree.
    Groups { groups: Vec<Value> },

    /// Answer to a [`ClientEvent::Ping`].
    Pong,
}

impl ServerEvent {
    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Short event name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Handshake(_) => "handshake",
            Self::Patch { .. } => "patch",
            Self::Board { .. } => "board",
            Self::BoardRemoved { .. } => "board_removed",
            Self::DeviceRemoved { .. } => "device_removed",
            Self::Groups { .. } => "groups",
            Self::Pong => "pong",
        }
    }
}

// ── Outbound ─────────────────────────────────────────────────────────

/// A message sent to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Ask a device to run one of its commands with the given value.
    Action {
        device_id: u64,
        command_id: u64,
        value: Value,
    },

    /// Ask the controller to push a full [`HandshakePayload`].
    Handshake,

    /// Latency check; answered by [`ServerEvent::Pong`].
    Ping,
}

impl ClientEvent {
    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn action_encodes_with_event_tag() {
        let frame = ClientEvent::Action {
            device_id: 7,
            command_id: 3,
            value: json!(true),
        }
        .encode()
        .unwrap();

        let parsed: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            parsed,
            json!({
                "event": "action",
                "data": { "device_id": 7, "command_id": 3, "value": true }
            })
        );
    }

    #[test]
    fn unit_requests_encode_without_payload() {
        let frame = ClientEvent::Handshake.encode().unwrap();
        let parsed: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed, json!({ "event": "handshake" }));
    }

    #[test]
    fn decode_patch() {
        let raw = r#"{"event":"patch","data":{"device_id":4,"patch":{"state":1}}}"#;
        let event = ServerEvent::decode(raw).unwrap();
        assert_eq!(
            event,
            ServerEvent::Patch {
                device_id: 4,
                patch: json!({ "state": 1 })
            }
        );
        assert_eq!(event.name(), "patch");
    }

    #[test]
    fn decode_handshake_with_missing_sections() {
        let raw = json!({
            "event": "handshake",
            "data": {
                "boards": { "1": { "id": 1, "model": "ArduinoBoard" } }
            }
        })
        .to_string();

        let ServerEvent::Handshake(payload) = ServerEvent::decode(&raw).unwrap() else {
            panic!("expected handshake");
        };
        assert_eq!(payload.boards.len(), 1);
        assert!(payload.devices.is_empty());
        assert!(payload.groups.is_empty());
        assert_eq!(payload.config, Value::Null);
    }

    #[test]
    fn decode_pong_without_data() {
        assert_eq!(
            ServerEvent::decode(r#"{"event":"pong"}"#).unwrap(),
            ServerEvent::Pong
        );
    }

    #[test]
    fn decode_unknown_event_fails() {
        assert!(ServerEvent::decode(r#"{"event":"reboot","data":{}}"#).is_err());
        assert!(ServerEvent::decode("not json at all").is_err());
    }
}
