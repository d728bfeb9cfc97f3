//! Integration tests for the `adminlink` CLI binary.
//!
//! Argument parsing, help output, shell completions, and configuration
//! errors, all without a live console.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `adminlink` binary with env isolation.
///
/// Clears all `ADMINLINK_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn adminlink_cmd_in(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("adminlink");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("ADMINLINK_PROFILE")
        .env_remove("ADMINLINK_SERVER")
        .env_remove("ADMINLINK_USERNAME")
        .env_remove("ADMINLINK_ROLE")
        .env_remove("ADMINLINK_TOKEN")
        .env_remove("ADMINLINK_OUTPUT")
        .env_remove("ADMINLINK_TIMEOUT");
    cmd
}

fn adminlink_cmd() -> assert_cmd::Command {
    adminlink_cmd_in(Path::new("/tmp/adminlink-cli-test-nonexistent"))
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = adminlink_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    adminlink_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("support console")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("sessions"))
            .and(predicate::str::contains("unban")),
    );
}

#[test]
fn test_version_flag() {
    adminlink_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("adminlink"));
}

#[test]
fn test_redirect_help_lists_placeholders() {
    adminlink_cmd()
        .args(["redirect", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("KEY=VALUE"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    adminlink_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    adminlink_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = adminlink_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_callers_add_requires_data() {
    let output = adminlink_cmd().args(["callers", "add"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_sessions_without_config() {
    adminlink_cmd()
        .arg("sessions")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No console configured"));
}

#[test]
fn test_non_http_server_is_a_usage_error() {
    adminlink_cmd()
        .args(["--server", "ftp://console.example.com", "-u", "ops", "sessions"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("server"));
}

#[test]
fn test_missing_username_is_an_auth_error() {
    adminlink_cmd()
        .args(["--server", "http://127.0.0.1:9", "sessions"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No operator username"));
}

#[test]
fn test_clear_requires_confirmation_when_not_interactive() {
    adminlink_cmd()
        .args(["--server", "http://127.0.0.1:9", "-u", "ops", "clear"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires confirmation"));
}

#[test]
fn test_unreachable_console_is_a_connection_error() {
    adminlink_cmd()
        .args([
            "--server",
            "http://127.0.0.1:9",
            "-u",
            "ops",
            "--token",
            "t0k",
            "--timeout",
            "1",
            "sessions",
        ])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Could not connect"));
}

#[test]
fn test_unknown_profile_lists_available_ones() {
    let home = tempfile::tempdir().unwrap();
    let config_dir = home.path().join(".config").join("adminlink");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "[profiles.lab]\nserver = \"http://127.0.0.1:9\"\nusername = \"ops\"\n",
    )
    .unwrap();

    adminlink_cmd_in(home.path())
        .args(["--profile", "prod", "sessions"])
        .assert()
        .code(4)
        .stderr(
            predicate::str::contains("Profile 'prod' not found")
                .and(predicate::str::contains("lab")),
        );
}
