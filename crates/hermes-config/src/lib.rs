//! Shared configuration for Hermes tools.
//!
//! TOML profiles (one per controller), environment overrides, and
//! translation to `hermes_core::SessionConfig`. The CLI layers its own
//! flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hermes_core::{DEFAULT_ENDPOINT, ReconnectConfig, SessionConfig};

/// Environment prefix; nested keys are separated by a double underscore,
/// e.g. `HERMES_DEFAULTS__TIMEOUT=5`.
pub const ENV_PREFIX: &str = "HERMES_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Seconds to wait for the first connection.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub reconnect: ReconnectSettings,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            reconnect: ReconnectSettings::default(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}

/// Reconnect backoff, in milliseconds so it reads naturally in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconnectSettings {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// `0` retries forever.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    5_000
}
fn default_max_retries() -> u32 {
    100_000
}

impl ReconnectSettings {
    pub fn to_reconnect_config(self) -> Result<ReconnectConfig, ConfigError> {
        if self.initial_delay_ms == 0 {
            return Err(ConfigError::Validation {
                field: "reconnect.initial_delay_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ConfigError::Validation {
                field: "reconnect.max_delay_ms".into(),
                reason: format!(
                    "{} is below initial_delay_ms ({})",
                    self.max_delay_ms, self.initial_delay_ms
                ),
            });
        }

        Ok(ReconnectConfig {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_retries: (self.max_retries > 0).then_some(self.max_retries),
        })
    }
}

/// A named controller profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Controller WebSocket endpoint (e.g., "ws://robot.local:9999/").
    pub controller: String,

    /// Override the default connect timeout (seconds).
    pub timeout: Option<u64>,

    /// Keepalive ping interval in seconds; unset disables it.
    pub ping_interval: Option<u64>,

    /// Override the default reconnect backoff.
    pub reconnect: Option<ReconnectSettings>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            controller: DEFAULT_ENDPOINT.into(),
            timeout: None,
            ping_interval: None,
            reconnect: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "hermes", "hermes").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("hermes");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing file is fine) merged with `HERMES_*` env vars.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    tracing::debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or unreadable.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to default config");
        Config::default()
    })
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile resolution ──────────────────────────────────────────────

impl Config {
    /// Pick a profile by name, else the default profile.
    ///
    /// The implicit `default` profile (local controller) is returned when
    /// nothing is configured at all; naming a missing profile is an error.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        let explicit = name.is_some();
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_owned();

        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile.clone())),
            None if !explicit && self.profiles.is_empty() => Ok((name, Profile::default())),
            None => Err(ConfigError::UnknownProfile { profile: name }),
        }
    }
}

/// Build a `SessionConfig` from a profile plus global defaults.
pub fn to_session_config(profile: &Profile, defaults: &Defaults) -> Result<SessionConfig, ConfigError> {
    let mut config =
        SessionConfig::new(&profile.controller).map_err(|e| ConfigError::Validation {
            field: "controller".into(),
            reason: e.to_string(),
        })?;

    config.reconnect = profile
        .reconnect
        .unwrap_or(defaults.reconnect)
        .to_reconnect_config()?;
    config.connect_timeout = match profile.timeout.unwrap_or(defaults.timeout) {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    config.ping_interval = profile
        .ping_interval
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    Ok(config)
}
