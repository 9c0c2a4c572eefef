// ── Board domain type ──

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::entity_id::EntityId;

/// A programmable board announced by the controller.
///
/// Only `id` and `model` are interpreted; everything else the controller
/// sends is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: EntityId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Kind tag resolved through the board registry (e.g. `"ArduinoBoard"`).
    #[serde(default)]
    pub model: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Board {
    pub fn new(id: EntityId, model: impl Into<String>) -> Self {
        Self {
            id,
            name: None,
            model: model.into(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name for display, falling back to `Board #<id>`.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Board #{}", self.id))
    }

    /// Whether the controller currently talks to this board.
    pub fn is_connected(&self) -> bool {
        self.extra
            .get("connected")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Protocol kind tag. The controller sends either a bare string or an
    /// object carrying a `controller` field.
    pub fn protocol_kind(&self) -> Option<&str> {
        match self.extra.get("protocol")? {
            Value::String(kind) => Some(kind),
            Value::Object(obj) => obj.get("controller").and_then(Value::as_str),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn keeps_unknown_fields() {
        let board: Board = serde_json::from_value(json!({
            "id": 1,
            "name": "arm",
            "model": "ArduinoBoard",
            "connected": true,
            "protocol": { "controller": "SerialProtocol", "port": "/dev/ttyUSB0" }
        }))
        .unwrap();

        assert_eq!(board.model, "ArduinoBoard");
        assert!(board.is_connected());
        assert_eq!(board.protocol_kind(), Some("SerialProtocol"));
        assert_eq!(board.extra["protocol"]["port"], "/dev/ttyUSB0");

        let back = serde_json::to_value(&board).unwrap();
        assert_eq!(back["connected"], true);
    }

    #[test]
    fn display_name_falls_back_to_id() {
        assert_eq!(Board::new(EntityId::new(3), "x").display_name(), "Board #3");
        assert_eq!(
            Board::new(EntityId::new(3), "x").with_name("base").display_name(),
            "base"
        );
    }

    #[test]
    fn missing_model_defaults_to_empty_tag() {
        let board: Board = serde_json::from_value(json!({ "id": 2 })).unwrap();
        assert_eq!(board.model, "");
        assert!(!board.is_connected());
        assert_eq!(board.protocol_kind(), None);
    }
}
