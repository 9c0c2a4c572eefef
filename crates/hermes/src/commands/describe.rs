//! `describe`: label, tooltip and feedback for one command.

use hermes_core::{Description, Overrides, Session};

use crate::cli::{DescribeArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

fn detail(d: &Description) -> String {
    [
        format!("Label:    {}", d.label),
        format!("Tooltip:  {}", d.tooltip),
        format!("Feedback: {}", d.feedback),
    ]
    .join("\n")
}

pub async fn handle(session: &Session, args: DescribeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let device_id = util::parse_id("device", &args.device)?;
    let command_id = util::parse_id("command", &args.command)?;

    util::wait_for_snapshot(session).await?;

    let overrides = Overrides {
        label: args.label,
        tooltip: args.tooltip,
        feedback: args.feedback,
    };
    let description = session
        .dispatcher()
        .describe(device_id, command_id, &overrides)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "command".into(),
            identifier: format!("{command_id} on device {device_id}"),
            list_command: format!("devices commands {device_id}"),
        })?;

    let out = output::render_single(&global.output, &description, detail, |d| d.label.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
