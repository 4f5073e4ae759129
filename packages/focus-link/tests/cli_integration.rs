use assert_cmd::Command;
use predicates::prelude::*;
use std::net::TcpListener;

fn focus_session() -> Command {
    let mut cmd = Command::cargo_bin("focus-session").unwrap();
    // Keep ambient settings out of the tests
    for var in [
        "FOCUS_TRANSPORT",
        "FOCUS_GAME_ID",
        "FOCUS_PRESCRIPTION_ID",
        "FOCUS_API_TOKEN",
        "FOCUS_API_BASE",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// A local port with nothing listening on it
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn test_no_args_shows_help() {
    focus_session()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    focus_session()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("focus-session"));
}

#[test]
fn test_play_help_lists_transport() {
    focus_session()
        .args(["play", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--transport"))
        .stdout(predicate::str::contains("--relay-url"));
}

#[test]
fn test_play_requires_upload_ids() {
    focus_session()
        .arg("play")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--game-id"));
}

#[test]
fn test_play_rejects_bad_relay_url() {
    focus_session()
        .args(["play", "--no-upload", "--transport", "relay", "--relay-url", "http://x"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("relay_url"));
}

#[test]
fn test_play_rejects_zero_duration() {
    focus_session()
        .args(["play", "--no-upload", "--duration", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("duration"));
}

#[test]
fn test_play_reports_unreachable_telemetry_server() {
    let port = closed_port().to_string();
    focus_session()
        .args(["play", "--no-upload", "--port", &port])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to connect to the telemetry server"));
}

#[test]
fn test_app_config_conflicts_with_ids() {
    focus_session()
        .args(["play", "--app-config", "app.json", "--game-id", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
