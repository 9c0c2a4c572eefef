//! Command dispatch: bridges CLI args -> session / store -> output formatting.

pub mod boards;
pub mod config_cmd;
pub mod describe;
pub mod devices;
pub mod groups;
pub mod send;
pub mod status;
pub mod util;
pub mod watch;

use hermes_core::Session;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a controller-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Boards(args) => boards::handle(session, args, global).await,
        Command::Devices(args) => devices::handle(session, args, global).await,
        Command::Groups(args) => groups::handle(session, args, global).await,
        Command::Send(args) => send::handle(session, args, global).await,
        Command::Describe(args) => describe::handle(session, args, global).await,
        Command::Watch(args) => watch::handle(session, args, global).await,
        Command::Status => status::handle(session, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "offline command routed to the session dispatcher".into(),
        )),
    }
}
