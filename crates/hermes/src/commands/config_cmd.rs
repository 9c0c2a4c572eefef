//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config as it would appear in the TOML file.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let reconnect = cfg.defaults.reconnect;
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults.reconnect]");
    let _ = writeln!(out, "initial_delay_ms = {}", reconnect.initial_delay_ms);
    let _ = writeln!(out, "max_delay_ms = {}", reconnect.max_delay_ms);
    let _ = writeln!(out, "max_retries = {}", reconnect.max_retries);

    for name in sorted_names(cfg) {
        let p = &cfg.profiles[&name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "controller = \"{}\"", p.controller);
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(every) = p.ping_interval {
            let _ = writeln!(out, "ping_interval = {every}");
        }
        if let Some(r) = p.reconnect {
            let _ = writeln!(
                out,
                "reconnect = {{ initial_delay_ms = {}, max_delay_ms = {}, max_retries = {} }}",
                r.initial_delay_ms, r.max_delay_ms, r.max_retries
            );
        }
    }

    out.trim_end().to_owned()
}

fn sorted_names(cfg: &Config) -> Vec<String> {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    names.sort();
    names
}

fn profile_not_found(cfg: &Config, name: String) -> CliError {
    let available = sorted_names(cfg);
    CliError::ProfileNotFound {
        name,
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init { name, endpoint } => {
            let mut cfg = config::load_config_or_default();
            let profile = cfg.profiles.entry(name.clone()).or_default();
            profile.controller = endpoint;
            // Reject an endpoint the session would refuse later.
            hermes_config::to_session_config(profile, &cfg.defaults)?;

            if cfg.default_profile.is_none() || cfg.profiles.len() == 1 {
                cfg.default_profile = Some(name.clone());
            }
            let path = config::save_config(&cfg)?;

            eprintln!("✓ Profile '{name}' written to {}", path.display());
            if cfg.default_profile.as_deref() != Some(name.as_str()) {
                eprintln!("  Make it the default: hermes config use {name}");
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                config::config_path().display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: hermes config init");
                return Ok(());
            }
            let active = config::active_profile_name(global, &cfg);
            let lines: Vec<String> = sorted_names(&cfg)
                .into_iter()
                .map(|name| {
                    let p: &Profile = &cfg.profiles[&name];
                    let marker = if name == active { "*" } else { " " };
                    format!("{marker} {name:<16} {}", p.controller)
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(&cfg, name));
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }
    }
}
