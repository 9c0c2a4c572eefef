//! CLI configuration: a thin wrapper around `hermes_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--controller, --timeout).

use clap::ValueEnum;
use hermes_core::SessionConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use hermes_config::{Config, Profile, config_path, load_config_or_default, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `SessionConfig` from the config file, profile, and flag overrides.
///
/// Flag overrides take priority over profile values. A `--controller`
/// flag works without any profile at all.
pub fn resolve_session_config(global: &GlobalOpts, cfg: &Config) -> Result<SessionConfig, CliError> {
    let mut profile = match cfg.profile(global.profile.as_deref()) {
        Ok((_, profile)) => profile,
        Err(_) if global.controller.is_some() => Profile::default(),
        Err(_) => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name: active_profile_name(global, cfg),
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
    };

    if let Some(ref controller) = global.controller {
        profile.controller.clone_from(controller);
    }
    profile.timeout = global.timeout.or(profile.timeout);

    Ok(hermes_config::to_session_config(&profile, &cfg.defaults)?)
}

/// Fill in the effective output format and color mode: a flag wins, else
/// the config file's `[defaults]`.
pub fn apply_display_defaults(global: &mut GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    global.output = match global.output_flag.clone() {
        Some(format) => format,
        None => parse_setting("defaults.output", &cfg.defaults.output)?,
    };
    global.color = match global.color_flag.clone() {
        Some(mode) => mode,
        None => parse_setting("defaults.color", &cfg.defaults.color)?,
    };
    Ok(())
}

fn parse_setting<T: ValueEnum>(field: &str, raw: &str) -> Result<T, CliError> {
    T::from_str(raw, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}
