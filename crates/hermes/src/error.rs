//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use hermes_config::ConfigError;
use hermes_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to controller at {url}")]
    #[diagnostic(
        code(hermes::connection_failed),
        help(
            "Check that the controller is running and reachable.\n\
             URL: {url}\n\
             Try: hermes status --controller ws://<host>:9999/"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Connection to the controller was lost after {attempts} reconnect attempts")]
    #[diagnostic(
        code(hermes::connection_lost),
        help("The controller stopped answering. Restart it, then run the command again.")
    )]
    ConnectionLost { attempts: u32 },

    #[error("Command was not sent: the controller is not connected")]
    #[diagnostic(
        code(hermes::not_connected),
        help("Messages are never queued while offline. Retry once the link is back.")
    )]
    NotConnected,

    #[error("Timed out after {seconds}s waiting for {what}")]
    #[diagnostic(
        code(hermes::timeout),
        help("Increase the wait with --timeout or check the controller.")
    )]
    Timeout { seconds: u64, what: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(hermes::not_found),
        help("Run: hermes {list_command} to see what the controller reports")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Controller sent inconsistent data: {message}")]
    #[diagnostic(code(hermes::controller_data))]
    ControllerData { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hermes::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(hermes::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: hermes config init --name {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(hermes::config))]
    Config(ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(hermes::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::ConnectionLost { .. } | Self::NotConnected => {
                exit_code::CONNECTION
            }
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn not_found(resource_type: &str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            list_command: format!("{resource_type}s list"),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::ControllerDisconnected => CliError::NotConnected,

            CoreError::ConnectionLost { attempts } => CliError::ConnectionLost { attempts },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::not_found(&entity_type, identifier),

            CoreError::GroupCycle { group, parent } => CliError::ControllerData {
                message: format!("group {group} would become its own ancestor via {parent}"),
            },

            CoreError::InvalidEntity {
                entity_type,
                message,
            } => CliError::ControllerData {
                message: format!("{entity_type}: {message}"),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
