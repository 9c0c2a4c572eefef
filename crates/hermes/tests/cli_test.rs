//! Integration tests for the `hermes` CLI binary.
//!
//! Argument parsing, help output, completions, the offline `config`
//! subcommands, and connection error handling. No controller is needed.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `hermes` binary with env isolation.
///
/// Clears all `HERMES_*` env vars and points config directories at `home`
/// so tests never touch the user's real configuration.
fn hermes_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("hermes");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("HERMES_PROFILE")
        .env_remove("HERMES_CONTROLLER")
        .env_remove("HERMES_OUTPUT")
        .env_remove("HERMES_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = hermes_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    hermes_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("boards")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("send"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn version_flag() {
    let home = tempfile::tempdir().unwrap();
    hermes_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hermes"));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();
    hermes_cmd(home.path())
        .arg("robots")
        .assert()
        .code(2);
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn completions_bash() {
    let home = tempfile::tempdir().unwrap();
    hermes_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hermes"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn config_path_lives_under_config_home() {
    let home = tempfile::tempdir().unwrap();
    hermes_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn config_init_then_profiles_and_use() {
    let home = tempfile::tempdir().unwrap();

    hermes_cmd(home.path())
        .args(["config", "init", "--name", "rover", "--endpoint", "ws://rover.local:9999/"])
        .assert()
        .success();
    hermes_cmd(home.path())
        .args(["config", "init", "--name", "arm", "--endpoint", "ws://arm.local:9999/"])
        .assert()
        .success();

    hermes_cmd(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("* rover")
                .and(predicate::str::contains("ws://arm.local:9999/")),
        );

    hermes_cmd(home.path())
        .args(["config", "use", "arm"])
        .assert()
        .success();
    hermes_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_profile = \"arm\""));
}

#[test]
fn config_file_output_default_applies_without_flag() {
    let home = tempfile::tempdir().unwrap();
    let path = hermes_cmd(home.path()).args(["config", "path"]).output().unwrap();
    let path = std::path::PathBuf::from(String::from_utf8(path.stdout).unwrap().trim());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[defaults]\noutput = \"json\"\n").unwrap();

    hermes_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"));

    // An explicit flag still wins.
    hermes_cmd(home.path())
        .args(["config", "show", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn config_init_rejects_http_endpoint() {
    let home = tempfile::tempdir().unwrap();
    hermes_cmd(home.path())
        .args(["config", "init", "--endpoint", "http://robot.local/"])
        .assert()
        .code(2);
}

#[test]
fn config_use_unknown_profile_fails() {
    let home = tempfile::tempdir().unwrap();
    hermes_cmd(home.path())
        .args(["config", "use", "nowhere"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("nowhere"));
}

// ── Connection errors ───────────────────────────────────────────────

#[test]
fn unreachable_controller_exits_with_connection_code() {
    let home = tempfile::tempdir().unwrap();
    // Port 1 is reserved and nothing listens there.
    hermes_cmd(home.path())
        .args(["status", "--controller", "ws://127.0.0.1:1/", "--timeout", "1"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("ws://127.0.0.1:1/"));
}

#[test]
fn unknown_profile_flag_fails_before_connecting() {
    let home = tempfile::tempdir().unwrap();
    hermes_cmd(home.path())
        .args(["boards", "list", "--profile", "ghost"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("ghost"));
}
