//! Device command handlers.

use std::sync::Arc;

use hermes_core::{BoardRef, Description, Device, EntityId, Overrides, Session};
use hermes_core::registry::render_value;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Board")]
    board: String,
    #[tabled(rename = "Actions")]
    actions: usize,
    #[tabled(rename = "Inputs")]
    inputs: usize,
    #[tabled(rename = "State")]
    state: String,
}

/// One action or input with its derived texts.
#[derive(Serialize)]
struct CommandView {
    id: EntityId,
    slot: &'static str,
    controller: String,
    #[serde(flatten)]
    description: Description,
}

#[derive(Tabled)]
struct CommandRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Slot")]
    slot: &'static str,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Feedback")]
    feedback: String,
    #[tabled(rename = "Tooltip")]
    tooltip: String,
}

impl From<&CommandView> for CommandRow {
    fn from(c: &CommandView) -> Self {
        Self {
            id: c.id.to_string(),
            slot: c.slot,
            label: c.description.label.clone(),
            feedback: c.description.feedback.clone(),
            tooltip: c.description.tooltip.clone(),
        }
    }
}

fn board_label(board: &BoardRef) -> String {
    match board {
        BoardRef::Resolved(b) => b.display_name(),
        BoardRef::Unknown(id) => format!("unknown #{id}"),
    }
}

fn row(device: &Arc<Device>, session: &Session) -> DeviceRow {
    DeviceRow {
        id: device.id.to_string(),
        name: util::or_dash(device.name.as_deref()),
        kind: format!("{:?}", session.registries().devices.resolve(device.kind())),
        board: board_label(&session.store().board_for(device)),
        actions: device.actions.len(),
        inputs: device.inputs.len(),
        state: render_value(&device.state),
    }
}

fn detail(device: &Arc<Device>, session: &Session) -> String {
    let mut lines = vec![
        format!("ID:      {}", device.id),
        format!("Name:    {}", util::or_dash(device.name.as_deref())),
        format!("Kind:    {}", util::or_dash(device.kind())),
        format!("Board:   {}", board_label(&session.store().board_for(device))),
        format!("State:   {}", render_value(&device.state)),
    ];
    for (slot, commands) in [("Actions", &device.actions), ("Inputs", &device.inputs)] {
        if commands.is_empty() {
            continue;
        }
        lines.push(format!("{slot}:"));
        for command in commands {
            lines.push(format!(
                "  #{} {} [{}] = {}",
                command.id,
                util::or_dash(command.name.as_deref()),
                command.controller,
                render_value(command.effective_state())
            ));
        }
    }
    lines.join("\n")
}

fn command_views(device: &Device, session: &Session) -> Vec<CommandView> {
    let dispatcher = session.dispatcher();
    let slots = device
        .actions
        .iter()
        .map(|c| ("action", c))
        .chain(device.inputs.iter().map(|c| ("input", c)));

    slots
        .filter_map(|(slot, command)| {
            let description = dispatcher.describe(device.id, command.id, &Overrides::default())?;
            Some(CommandView {
                id: command.id,
                slot,
                controller: command.controller.clone(),
                description,
            })
        })
        .collect()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::wait_for_snapshot(session).await?;
    let store = session.store();

    match args.command {
        DevicesCommand::List { board, dangling } => {
            let devices: Vec<Arc<Device>> = match (board, dangling) {
                (Some(board), _) => store.devices_on(util::parse_id("board", &board)?),
                (None, true) => store.dangling_devices(),
                (None, false) => store.devices_snapshot().iter().cloned().collect(),
            };
            let out = output::render_list(
                &global.output,
                &devices,
                |d| row(d, session),
                |d| d.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { device } => {
            let id = util::parse_id("device", &device)?;
            let found = store
                .device(id)
                .ok_or_else(|| CliError::not_found("device", device))?;
            let out = output::render_single(
                &global.output,
                &found,
                |d| detail(d, session),
                |d| d.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Commands { device } => {
            let id = util::parse_id("device", &device)?;
            let found = store
                .device(id)
                .ok_or_else(|| CliError::not_found("device", device))?;
            let views = command_views(&found, session);
            let out = output::render_list(
                &global.output,
                &views,
                |c| CommandRow::from(c),
                |c| c.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
