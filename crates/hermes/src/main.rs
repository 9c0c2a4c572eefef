mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hermes_core::Session;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(mut cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "hermes", &mut std::io::stdout());
            Ok(())
        }

        command => {
            let cfg = config::load_config_or_default();
            config::apply_display_defaults(&mut cli.global, &cfg)?;

            match command {
                // Config commands don't need a controller connection
                Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

                // All other commands require a controller connection
                cmd => {
                    let session_config = config::resolve_session_config(&cli.global, &cfg)?;
                    let session = Session::new(session_config);

                    tracing::debug!(command = ?cmd, "dispatching command");
                    session.connect().await?;
                    let result = commands::dispatch(cmd, &session, &cli.global).await;
                    session.disconnect().await;
                    result
                }
            }
        }
    }
}
