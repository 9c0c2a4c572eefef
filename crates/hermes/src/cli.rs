//! Clap derive structures for the `hermes` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hermes -- observe and command robot hardware from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "hermes",
    version,
    about = "Observe and command Hermes robot controllers",
    long_about = "Connects to a Hermes hardware controller over WebSocket, mirrors its\n\
        boards, devices and groups, and sends commands to the hardware.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Controller profile to use
    #[arg(long, short = 'p', env = "HERMES_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller endpoint, e.g. ws://robot.local:9999/ (overrides profile)
    #[arg(long, short = 'c', env = "HERMES_CONTROLLER", global = true)]
    pub controller: Option<String>,

    /// Output format [default: `defaults.output` from the config file, else table]
    #[arg(
        long = "output",
        short = 'o',
        env = "HERMES_OUTPUT",
        value_name = "FORMAT",
        global = true
    )]
    pub output_flag: Option<OutputFormat>,

    /// When to use color output [default: `defaults.color` from the config file, else auto]
    #[arg(long = "color", value_name = "WHEN", global = true)]
    pub color_flag: Option<ColorMode>,

    /// Effective output format, filled in by `config::apply_display_defaults`.
    #[arg(skip)]
    pub output: OutputFormat,

    /// Effective color mode, filled in by `config::apply_display_defaults`.
    #[arg(skip)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Seconds to wait for the controller (overrides profile, 0 waits forever)
    #[arg(long, env = "HERMES_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    #[default]
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and inspect boards
    #[command(alias = "b")]
    Boards(BoardsArgs),

    /// List and inspect devices and their commands
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Show the group tree
    #[command(alias = "g")]
    Groups(GroupsArgs),

    /// Send a command value to a device
    Send(SendArgs),

    /// Show label, tooltip and feedback for a command
    Describe(DescribeArgs),

    /// Stream link events and store changes until interrupted
    Watch(WatchArgs),

    /// Connection status and controller profile
    Status,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Boards ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BoardsArgs {
    #[command(subcommand)]
    pub command: BoardsCommand,
}

#[derive(Debug, Subcommand)]
pub enum BoardsCommand {
    /// List all boards
    #[command(alias = "ls")]
    List,

    /// Show one board and the devices wired to it
    Get {
        /// Board id
        board: String,
    },
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List all devices
    #[command(alias = "ls")]
    List {
        /// Only devices on this board
        #[arg(long, short = 'b')]
        board: Option<String>,

        /// Only devices whose board is unknown
        #[arg(long, conflicts_with = "board")]
        dangling: bool,
    },

    /// Show one device
    Get {
        /// Device id
        device: String,
    },

    /// List a device's actions and inputs with their descriptions
    Commands {
        /// Device id
        device: String,
    },
}

// ── Groups ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// List all groups
    #[command(alias = "ls")]
    List,

    /// Print the group hierarchy
    Tree,
}

// ── Send / Describe ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Device id
    pub device: String,

    /// Command (action) id
    pub command: String,

    /// Value as JSON (`true`, `90`, `"on"`); bare words are sent as strings
    pub value: String,

    /// Wait for the controller to confirm the new state
    #[arg(long, short = 'w')]
    pub wait: bool,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Device id
    pub device: String,

    /// Command id
    pub command: String,

    /// Override the derived label
    #[arg(long)]
    pub label: Option<String>,

    /// Override the derived tooltip
    #[arg(long)]
    pub tooltip: Option<String>,

    /// Override the derived feedback
    #[arg(long)]
    pub feedback: Option<String>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Also print every controller message, not just lifecycle changes
    #[arg(long, short = 'm')]
    pub messages: bool,

    /// Stop after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile in the config file
    Init {
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,

        /// Controller endpoint for the profile
        #[arg(long, default_value = hermes_core::DEFAULT_ENDPOINT)]
        endpoint: String,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
