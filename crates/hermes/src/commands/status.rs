//! `status`: connection status, controller settings and store counts.

use hermes_core::{ConnectionStatus, Profile, ServerSettings, Session};
use serde::Serialize;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, Palette, Tone};

use super::util;

#[derive(Serialize)]
struct StatusView {
    endpoint: String,
    #[serde(flatten)]
    connection: ConnectionStatus,
    profile: Profile,
    boards: usize,
    devices: usize,
    groups: usize,
    dangling_devices: usize,
    /// Seconds since the last message from the controller.
    data_age_secs: Option<i64>,
}

fn server_line(settings: Option<&ServerSettings>) -> String {
    settings.map_or_else(
        || "-".to_owned(),
        |s| {
            let host = s.host.as_deref().unwrap_or("*");
            let port = s.port.map_or_else(|| "?".to_owned(), |p| p.to_string());
            match s.enabled {
                Some(false) => format!("{host}:{port} (disabled)"),
                _ => format!("{host}:{port}"),
            }
        },
    )
}

fn detail(view: &StatusView, palette: Palette) -> String {
    let state = if view.connection.connected {
        palette.paint("connected", Tone::Good)
    } else {
        palette.paint("disconnected", Tone::Bad)
    };
    [
        format!("Controller: {} ({state})", view.endpoint),
        format!("Profile:    {}: {}", view.profile.name, view.profile.description),
        format!("Server:     {}", server_line(view.connection.server.as_ref())),
        format!("Web:        {}", server_line(view.connection.web.as_ref())),
        format!(
            "Entities:   {} boards, {} devices ({} unattached), {} groups",
            view.boards, view.devices, view.dangling_devices, view.groups
        ),
        format!(
            "Data age:   {}",
            view.data_age_secs
                .map_or_else(|| "-".to_owned(), |secs| format!("{secs}s"))
        ),
    ]
    .join("\n")
}

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    util::wait_for_snapshot(session).await?;
    let store = session.store();

    let view = StatusView {
        endpoint: session.config().url.to_string(),
        connection: session.connection_status(),
        profile: store.profile(),
        boards: store.board_count(),
        devices: store.device_count(),
        groups: store.group_count(),
        dangling_devices: store.dangling_devices().len(),
        data_age_secs: store.data_age().map(|age| age.num_seconds()),
    };

    let palette = Palette::new(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| detail(v, palette),
        |v| v.endpoint.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
