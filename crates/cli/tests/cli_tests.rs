//! CLI integration tests

use std::process::Command;

fn recorderctl(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_recorderctl"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = recorderctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Metrics Recorder"), "Should show app name");
    assert!(stdout.contains("start"), "Should show start command");
    assert!(stdout.contains("stop"), "Should show stop command");
    assert!(stdout.contains("status"), "Should show status command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = recorderctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("recorderctl"), "Should show binary name");
}

#[test]
fn test_start_help_lists_options() {
    let output = recorderctl(&["start", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--run-id"));
    assert!(stdout.contains("--interval-ms"));
    assert!(stdout.contains("--workload"));
}

#[test]
fn test_start_without_workload_fails() {
    let output = recorderctl(&["start", "--run-id", "r1"]);
    assert!(!output.status.success());
}

#[test]
fn test_stop_against_unreachable_endpoint_fails() {
    let output = recorderctl(&["--endpoint", "http://127.0.0.1:1", "stop"]);
    assert!(!output.status.success());
}
