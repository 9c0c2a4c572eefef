// ── Command controllers ──
//
// A command controller turns a command's live fields into the three
// strings a UI shows next to it: label, tooltip and feedback.

use std::fmt;

use serde_json::Value;

use crate::model::{Command, Device};
use crate::store::BoardRef;

/// Text shown when no controller handles a command kind.
pub const NO_CONTROLLER_TEXT: &str = "No UI controller for this command.";

/// Everything a controller may look at when describing a command.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub device: &'a Device,
    pub command: &'a Command,
    pub board: &'a BoardRef,
}

impl CommandContext<'_> {
    /// Command name, falling back to the device name, then the command id.
    pub fn name(&self) -> String {
        self.command
            .name
            .clone()
            .or_else(|| self.device.name.clone())
            .unwrap_or_else(|| format!("#{}", self.command.id))
    }

    pub fn pin(&self) -> String {
        self.command
            .pin
            .as_ref()
            .map_or_else(|| "?".to_owned(), render_value)
    }
}

/// Render a JSON value for display: strings unquoted, `null` as `-`.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_owned(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Handler for one command-controller kind tag.
pub trait CommandController: fmt::Debug + Send + Sync {
    /// Kind tag this controller answers to.
    fn kind(&self) -> &'static str;

    /// Firmware command code, if the command maps to one.
    fn code(&self) -> Option<u8> {
        None
    }

    fn format_state(&self, state: &Value) -> String {
        render_value(state)
    }

    fn label(&self, ctx: &CommandContext<'_>) -> String {
        format!("Command \"{}\"", ctx.name())
    }

    fn tooltip(&self, ctx: &CommandContext<'_>) -> String {
        let state = self.format_state(ctx.command.effective_state());
        match ctx.board {
            BoardRef::Resolved(board) => format!(
                "Board \"{}\" (PIN {}): {state}",
                board.display_name(),
                ctx.pin()
            ),
            BoardRef::Unknown(id) => format!("Unknown board #{id} (PIN {}): {state}", ctx.pin()),
        }
    }

    fn feedback(&self, ctx: &CommandContext<'_>) -> String {
        format!(
            "PIN {}: {}",
            ctx.pin(),
            self.format_state(ctx.command.effective_state())
        )
    }
}

fn on_off(state: &Value) -> String {
    match state {
        Value::Bool(true) => "on".to_owned(),
        Value::Bool(false) => "off".to_owned(),
        Value::Number(n) if n.as_f64().is_some_and(|v| v.abs() > f64::EPSILON) => "on".to_owned(),
        Value::Number(_) => "off".to_owned(),
        other => render_value(other),
    }
}

// ── Built-in controllers ─────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct BooleanActionCommand;

impl CommandController for BooleanActionCommand {
    fn kind(&self) -> &'static str {
        "BooleanActionCommand"
    }

    fn code(&self) -> Option<u8> {
        Some(41)
    }

    fn format_state(&self, state: &Value) -> String {
        on_off(state)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ServoCommand;

impl CommandController for ServoCommand {
    fn kind(&self) -> &'static str {
        "ServoCommand"
    }

    fn code(&self) -> Option<u8> {
        Some(42)
    }

    fn format_state(&self, state: &Value) -> String {
        match state.as_f64() {
            Some(angle) => format!("{angle}°"),
            None => render_value(state),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BlinkCommand;

impl CommandController for BlinkCommand {
    fn kind(&self) -> &'static str {
        "BlinkCommand"
    }

    fn code(&self) -> Option<u8> {
        Some(43)
    }

    fn format_state(&self, state: &Value) -> String {
        match on_off(state).as_str() {
            "on" => "blinking".to_owned(),
            other => other.to_owned(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OnOffCommand;

impl CommandController for OnOffCommand {
    fn kind(&self) -> &'static str {
        "OnOffCommand"
    }

    fn code(&self) -> Option<u8> {
        Some(44)
    }

    fn format_state(&self, state: &Value) -> String {
        on_off(state)
    }
}

/// Read-only input (sensor) slot.
#[derive(Debug, Default, Clone, Copy)]
pub struct BooleanInputCommand;

impl CommandController for BooleanInputCommand {
    fn kind(&self) -> &'static str {
        "BooleanInputCommand"
    }

    fn code(&self) -> Option<u8> {
        Some(141)
    }

    fn format_state(&self, state: &Value) -> String {
        on_off(state)
    }
}

/// Default controller for unknown kinds: keeps label and tooltip, but has
/// no feedback of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericController;

impl CommandController for GenericController {
    fn kind(&self) -> &'static str {
        "GenericController"
    }

    fn feedback(&self, _ctx: &CommandContext<'_>) -> String {
        NO_CONTROLLER_TEXT.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Board, EntityId};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn fixture(controller: &str, state: Value) -> (Device, Command) {
        let mut command = Command::new(EntityId::new(3), controller);
        command.name = Some("light".into());
        command.pin = Some(json!(13));
        command.state = state;
        let device = Device::new(EntityId::new(7), EntityId::new(1));
        (device, command)
    }

    #[test]
    fn default_texts_use_live_fields() {
        let (device, command) = fixture("OnOffCommand", json!(true));
        let board = BoardRef::Resolved(Arc::new(
            Board::new(EntityId::new(1), "ArduinoBoard").with_name("mega"),
        ));
        let ctx = CommandContext {
            device: &device,
            command: &command,
            board: &board,
        };

        assert_eq!(OnOffCommand.label(&ctx), "Command \"light\"");
        assert_eq!(OnOffCommand.tooltip(&ctx), "Board \"mega\" (PIN 13): on");
        assert_eq!(OnOffCommand.feedback(&ctx), "PIN 13: on");
    }

    #[test]
    fn unknown_board_is_reported_in_tooltip() {
        let (device, command) = fixture("ServoCommand", json!(45));
        let board = BoardRef::Unknown(EntityId::new(99));
        let ctx = CommandContext {
            device: &device,
            command: &command,
            board: &board,
        };

        assert_eq!(ServoCommand.tooltip(&ctx), "Unknown board #99 (PIN 13): 45°");
    }

    #[test]
    fn generic_controller_has_no_feedback() {
        let (device, command) = fixture("Mystery", Value::Null);
        let board = BoardRef::Unknown(EntityId::new(1));
        let ctx = CommandContext {
            device: &device,
            command: &command,
            board: &board,
        };

        assert_eq!(GenericController.feedback(&ctx), NO_CONTROLLER_TEXT);
        assert_eq!(GenericController.label(&ctx), "Command \"light\"");
    }

    #[test]
    fn name_falls_back_to_device_then_id() {
        let mut device = Device::new(EntityId::new(7), EntityId::new(1));
        let command = Command::new(EntityId::new(3), "OnOffCommand");
        let board = BoardRef::Unknown(EntityId::new(1));

        let ctx = CommandContext {
            device: &device,
            command: &command,
            board: &board,
        };
        assert_eq!(ctx.name(), "#3");
        assert_eq!(ctx.pin(), "?");

        device.name = Some("lamp".into());
        let ctx = CommandContext {
            device: &device,
            command: &command,
            board: &board,
        };
        assert_eq!(ctx.name(), "lamp");
    }

    #[test]
    fn blink_and_boolean_formatting() {
        assert_eq!(BlinkCommand.format_state(&json!(1)), "blinking");
        assert_eq!(BlinkCommand.format_state(&json!(false)), "off");
        assert_eq!(BooleanInputCommand.format_state(&json!(0)), "off");
        assert_eq!(BooleanActionCommand.format_state(&Value::Null), "-");
    }
}
