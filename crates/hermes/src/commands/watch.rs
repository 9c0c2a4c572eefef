//! `watch`: stream link lifecycle and store changes until interrupted.

use std::time::Duration;

use chrono::Local;
use hermes_core::{LinkEvent, ServerEvent, Session};
use tokio::sync::broadcast::error::RecvError;

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::{self, Palette, Tone};

fn lifecycle(event: &LinkEvent) -> Option<(String, Tone)> {
    let line = match event {
        LinkEvent::Connected => ("connected".to_owned(), Tone::Good),
        LinkEvent::Disconnected => ("disconnected".to_owned(), Tone::Warn),
        LinkEvent::Reconnecting { attempt, delay } => (
            format!("reconnecting (attempt {attempt}, in {}ms)", delay.as_millis()),
            Tone::Warn,
        ),
        LinkEvent::ReconnectFailed { attempt, reason } => {
            (format!("attempt {attempt} failed: {reason}"), Tone::Muted)
        }
        LinkEvent::GivenUp { attempts } => {
            (format!("connection lost after {attempts} attempts"), Tone::Bad)
        }
        LinkEvent::Message(_) => return None,
    };
    Some(line)
}

fn summarize(message: &ServerEvent) -> String {
    match message {
        ServerEvent::Handshake(payload) => format!(
            "handshake: {} boards, {} devices, {} groups",
            payload.boards.len(),
            payload.devices.len(),
            payload.groups.len()
        ),
        ServerEvent::Patch { device_id, patch } => format!("patch device #{device_id}: {patch}"),
        ServerEvent::Board { board } => format!(
            "board {}",
            board.get("id").map_or_else(|| "?".to_owned(), ToString::to_string)
        ),
        ServerEvent::BoardRemoved { board_id } => format!("board #{board_id} removed"),
        ServerEvent::DeviceRemoved { device_id } => format!("device #{device_id} removed"),
        ServerEvent::Groups { groups } => format!("groups: {} entries", groups.len()),
        ServerEvent::Pong => "pong".to_owned(),
    }
}

fn print_event(event: &LinkEvent, args: &WatchArgs, global: &GlobalOpts, palette: Palette) {
    if matches!(global.output, OutputFormat::Json | OutputFormat::JsonCompact) {
        if let LinkEvent::Message(message) = event {
            if args.messages {
                match output::json_line(message) {
                    Ok(line) => output::print_output(&line, global.quiet),
                    Err(e) => tracing::warn!(error = %e, "skipping unprintable message"),
                }
            }
        }
        return;
    }

    let stamp = Local::now().format("%H:%M:%S");
    let line = match (lifecycle(event), event) {
        (Some((text, tone)), _) => palette.paint(&text, tone),
        (None, LinkEvent::Message(message)) if args.messages => summarize(message),
        _ => return,
    };
    output::print_output(&format!("{stamp} {line}"), global.quiet);
}

pub async fn handle(session: &Session, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let palette = Palette::new(&global.color);
    let mut events = session.subscribe_events();
    let deadline = args.duration.map(Duration::from_secs);

    if session.connection_status().connected {
        print_event(&LinkEvent::Connected, &args, global, palette);
    }

    let watch = async {
        loop {
            match events.recv().await {
                Ok(event) => {
                    print_event(&event, &args, global, palette);
                    if let LinkEvent::GivenUp { attempts } = *event {
                        return Err(CliError::ConnectionLost { attempts });
                    }
                }
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "watch fell behind"),
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    };

    let limit = async {
        match deadline {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = watch => result,
        _ = tokio::signal::ctrl_c() => Ok(()),
        () = limit => Ok(()),
    }
}
