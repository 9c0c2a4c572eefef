//! Board command handlers.

use std::sync::Arc;

use hermes_core::{Board, Registries, Session};
use tabled::Tabled;

use crate::cli::{BoardsArgs, BoardsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct BoardRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Connected")]
    connected: String,
    #[tabled(rename = "Devices")]
    devices: usize,
}

fn row(board: &Arc<Board>, session: &Session) -> BoardRow {
    let registries = session.registries();
    BoardRow {
        id: board.id.to_string(),
        name: board.display_name(),
        model: board.model.clone(),
        kind: format!("{:?}", registries.boards.resolve(board.model.as_str())),
        connected: if board.is_connected() { "yes" } else { "no" }.into(),
        devices: session.store().devices_on(board.id).len(),
    }
}

fn protocol_line(board: &Board, registries: &Registries) -> String {
    let protocol = registries.protocols.resolve(board.protocol_kind());
    let target = board
        .extra
        .get("port")
        .or_else(|| board.extra.get("protocol").and_then(|p| p.get("port")))
        .and_then(|p| p.as_str());

    match target {
        Some(port) => format!("{} {port}", protocol.describe()),
        None => protocol.describe().to_owned(),
    }
}

fn detail(board: &Arc<Board>, session: &Session) -> String {
    let mut lines = vec![
        format!("ID:        {}", board.id),
        format!("Name:      {}", board.display_name()),
        format!("Model:     {}", board.model),
        format!("Connected: {}", board.is_connected()),
        format!("Protocol:  {}", protocol_line(board, session.registries())),
    ];

    let devices = session.store().devices_on(board.id);
    if !devices.is_empty() {
        lines.push("Devices:".into());
        for device in devices {
            lines.push(format!(
                "  #{} {}",
                device.id,
                util::or_dash(device.name.as_deref())
            ));
        }
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, args: BoardsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::wait_for_snapshot(session).await?;
    let store = session.store();

    match args.command {
        BoardsCommand::List => {
            let snap = store.boards_snapshot();
            let out = output::render_list(
                &global.output,
                &snap,
                |b| row(b, session),
                |b| b.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BoardsCommand::Get { board } => {
            let id = util::parse_id("board", &board)?;
            let found = store
                .board(id)
                .ok_or_else(|| CliError::not_found("board", board))?;
            let out = output::render_single(
                &global.output,
                &found,
                |b| detail(b, session),
                |b| b.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
