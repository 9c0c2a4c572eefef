// ── Device and command domain types ──

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::entity_id::EntityId;

/// An action or input slot on a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: EntityId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Kind tag resolved through the command-controller registry.
    #[serde(default)]
    pub controller: String,

    /// Seed value used until the controller reports a state.
    #[serde(default)]
    pub default: Value,

    /// Last value reported by the controller.
    #[serde(default)]
    pub state: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Command {
    pub fn new(id: EntityId, controller: impl Into<String>) -> Self {
        Self {
            id,
            name: None,
            controller: controller.into(),
            default: Value::Null,
            state: Value::Null,
            pin: None,
            extra: Map::new(),
        }
    }

    /// `state` when the controller reported one, else `default`.
    pub fn effective_state(&self) -> &Value {
        if self.state.is_null() {
            &self.default
        } else {
            &self.state
        }
    }
}

/// A piece of hardware wired to a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: EntityId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Owning board. May dangle if the board was removed.
    #[serde(default)]
    pub board: EntityId,

    #[serde(default)]
    pub state: Value,

    #[serde(default)]
    pub actions: Vec<Command>,

    #[serde(default)]
    pub inputs: Vec<Command>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    pub fn new(id: EntityId, board: EntityId) -> Self {
        Self {
            id,
            name: None,
            board,
            state: Value::Null,
            actions: Vec::new(),
            inputs: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Device kind tag, if the controller sent one.
    pub fn kind(&self) -> Option<&str> {
        self.extra.get("type").and_then(Value::as_str)
    }

    /// Find a command among actions first, then inputs.
    pub fn command(&self, id: EntityId) -> Option<&Command> {
        self.actions
            .iter()
            .chain(&self.inputs)
            .find(|c| c.id == id)
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.actions.iter().chain(&self.inputs)
    }
}
