//! `send`: dispatch a value to a device command.

use hermes_core::{Overrides, Session};

use crate::cli::{GlobalOpts, SendArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(session: &Session, args: SendArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let device_id = util::parse_id("device", &args.device)?;
    let command_id = util::parse_id("command", &args.command)?;
    let value = util::parse_value(&args.value);

    util::wait_for_snapshot(session).await?;

    let device = session
        .store()
        .device(device_id)
        .ok_or_else(|| CliError::not_found("device", args.device.clone()))?;
    if device.command(command_id).is_none() {
        return Err(CliError::NotFound {
            resource_type: "command".into(),
            identifier: format!("{} on device {device_id}", args.command),
            list_command: format!("devices commands {device_id}"),
        });
    }

    let dispatcher = session.dispatcher();
    // Subscribe before sending so the confirmation cannot slip past.
    let mut confirmation = dispatcher.watch_description(device_id, command_id, Overrides::default());

    tracing::info!(%device_id, %command_id, %value, "sending command");
    if !dispatcher.dispatch(device_id, command_id, value) {
        return Err(CliError::NotConnected);
    }

    if !args.wait {
        if !global.quiet {
            eprintln!("Command sent");
        }
        return Ok(());
    }

    let limit = session
        .config()
        .connect_timeout
        .unwrap_or(std::time::Duration::from_secs(10));
    let updated = tokio::time::timeout(limit, confirmation.changed())
        .await
        .map_err(|_| util::timeout_error(limit, "the controller to confirm"))?
        .ok_or_else(|| CliError::not_found("device", args.device))?;

    let out = output::render_single(
        &global.output,
        &updated,
        |d| d.feedback.clone(),
        |d| d.feedback.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
