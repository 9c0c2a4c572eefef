// ── Command dispatch ──
//
// Outbound: (device, command, value) goes straight to the link; the store
// only changes when the controller confirms through a `patch`.
// Inbound: `merge_device_patch` folds a field-level patch into the stored
// device before the bridge upserts it.

use std::sync::Arc;

use futures_core::Stream;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::convert;
use crate::error::CoreError;
use crate::model::{Board, Device, EntityId};
use crate::registry::{CommandContext, Registries};
use crate::store::DataStore;
use crate::stream::EntityStream;

/// Where dispatched commands go. Implemented by [`Session`](crate::Session).
pub trait CommandSink: Send + Sync {
    /// Fire-and-forget. `false` means the message was dropped.
    fn send_action(&self, device_id: EntityId, command_id: EntityId, value: Value) -> bool;
}

// ── Patch merge ─────────────────────────────────────────────────────

/// Fold `patch` into `existing`.
///
/// Top-level fields are replaced one by one; fields absent from the patch
/// keep their stored value. `actions` and `inputs` merge per command id:
/// known commands are patched in place, new ones appended, unmentioned ones
/// kept. Without an existing record the patch must describe a whole device.
pub fn merge_device_patch(
    existing: Option<&Device>,
    id: EntityId,
    patch: &Value,
) -> Result<Device, CoreError> {
    let Value::Object(patch) = patch else {
        return Err(CoreError::InvalidEntity {
            entity_type: "device".into(),
            message: format!("patch for device {id} is not an object"),
        });
    };

    let mut merged = match existing {
        Some(device) => match serde_json::to_value(device) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(CoreError::invalid("device", &e)),
        },
        None => Map::new(),
    };

    for (key, value) in patch {
        if matches!(key.as_str(), "actions" | "inputs") {
            if let (Some(Value::Array(current)), Value::Array(incoming)) =
                (merged.get_mut(key), value)
            {
                merge_commands(current, incoming);
                continue;
            }
        }
        merged.insert(key.clone(), value.clone());
    }
    merged.insert("id".into(), Value::from(id.get()));

    convert::device_from_value(Value::Object(merged))
}

fn merge_commands(current: &mut Vec<Value>, incoming: &[Value]) {
    for update in incoming {
        let slot = update
            .get("id")
            .and_then(|uid| current.iter_mut().find(|c| c.get("id") == Some(uid)));

        match (slot, update) {
            (Some(Value::Object(stored)), Value::Object(fields)) => {
                for (k, v) in fields {
                    stored.insert(k.clone(), v.clone());
                }
            }
            (Some(stored), _) => *stored = update.clone(),
            (None, _) => current.push(update.clone()),
        }
    }
}

// ── Descriptions ────────────────────────────────────────────────────

/// Caller-supplied texts that take precedence over derived ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub label: Option<String>,
    pub tooltip: Option<String>,
    pub feedback: Option<String>,
}

/// What a UI shows next to a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Description {
    pub label: String,
    pub tooltip: String,
    pub feedback: String,
}

// ── CommandDispatcher ───────────────────────────────────────────────

/// Sends commands and projects their live descriptions. Cheap to clone.
#[derive(Clone)]
pub struct CommandDispatcher {
    store: Arc<DataStore>,
    registries: Arc<Registries>,
    sink: Arc<dyn CommandSink>,
}

impl CommandDispatcher {
    pub fn new(
        store: Arc<DataStore>,
        registries: Arc<Registries>,
        sink: Arc<dyn CommandSink>,
    ) -> Self {
        Self {
            store,
            registries,
            sink,
        }
    }

    /// Forward a command to the controller. The store is left alone; the
    /// new state arrives as a `patch` once the hardware has applied it.
    pub fn dispatch(&self, device_id: EntityId, command_id: EntityId, value: Value) -> bool {
        if self
            .store
            .device(device_id)
            .and_then(|d| d.command(command_id).map(|_| ()))
            .is_none()
        {
            tracing::debug!(%device_id, %command_id, "dispatching to a command not in the store");
        }
        self.sink.send_action(device_id, command_id, value)
    }

    /// Derive label, tooltip and feedback for one command.
    ///
    /// `None` when the device or command is unknown. A missing board is
    /// reported in the tooltip.
    pub fn describe(
        &self,
        device_id: EntityId,
        command_id: EntityId,
        overrides: &Overrides,
    ) -> Option<Description> {
        let device = self.store.device(device_id)?;
        self.describe_device(&device, command_id, overrides)
    }

    fn describe_device(
        &self,
        device: &Device,
        command_id: EntityId,
        overrides: &Overrides,
    ) -> Option<Description> {
        let command = device.command(command_id)?;
        let board = self.store.board_for(device);
        let controller = self.registries.commands.resolve(command.controller.as_str());
        let ctx = CommandContext {
            device,
            command,
            board: &board,
        };

        Some(Description {
            label: overrides
                .label
                .clone()
                .unwrap_or_else(|| controller.label(&ctx)),
            tooltip: overrides
                .tooltip
                .clone()
                .unwrap_or_else(|| controller.tooltip(&ctx)),
            feedback: overrides
                .feedback
                .clone()
                .unwrap_or_else(|| controller.feedback(&ctx)),
        })
    }

    /// Live description that updates with the device and its board.
    pub fn watch_description(
        &self,
        device_id: EntityId,
        command_id: EntityId,
        overrides: Overrides,
    ) -> DescriptionStream {
        let last = self.describe(device_id, command_id, &overrides);
        let seen = last.is_some();
        DescriptionStream {
            dispatcher: self.clone(),
            device_id,
            command_id,
            overrides,
            devices: self.store.subscribe_devices(),
            boards: self.store.subscribe_boards(),
            last,
            seen,
        }
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("commands", &self.registries.commands.len())
            .finish_non_exhaustive()
    }
}

// ── DescriptionStream ───────────────────────────────────────────────

/// Recomputes a [`Description`] whenever devices or boards change and
/// yields only when the result differs from the previous one.
///
/// The stream ends once a device or command it has seen is gone.
pub struct DescriptionStream {
    dispatcher: CommandDispatcher,
    device_id: EntityId,
    command_id: EntityId,
    overrides: Overrides,
    devices: EntityStream<Device>,
    boards: EntityStream<Board>,
    last: Option<Description>,
    seen: bool,
}

impl DescriptionStream {
    /// Description as of the last yield (or creation).
    pub fn current(&self) -> Option<&Description> {
        self.last.as_ref()
    }

    /// Wait for the description to change.
    ///
    /// A stream created before its device or command arrives waits for it;
    /// once seen, its disappearance ends the stream with `None`.
    pub async fn changed(&mut self) -> Option<Description> {
        loop {
            let alive = tokio::select! {
                d = self.devices.changed() => d.is_some(),
                b = self.boards.changed() => b.is_some(),
            };
            if !alive {
                return None;
            }

            let device = self
                .devices
                .latest()
                .iter()
                .find(|d| d.id == self.device_id)
                .cloned();
            let next = device.and_then(|d| {
                self.dispatcher
                    .describe_device(&d, self.command_id, &self.overrides)
            });

            match next {
                None if self.seen => return None,
                None => {}
                Some(description) if self.last.as_ref() != Some(&description) => {
                    self.seen = true;
                    self.last = Some(description.clone());
                    return Some(description);
                }
                Some(_) => {}
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Description> + Send {
        futures_util::stream::unfold(self, |mut this| async move {
            this.changed().await.map(|d| (d, this))
        })
    }
}
