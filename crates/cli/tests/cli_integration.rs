//! CLI integration tests for the `talon` subcommands.
//!
//! Uses `assert_cmd` to spawn the `talon` binary and verify
//! exit codes, stdout content, and stderr content.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

/// Helper: create a Command for the `talon` binary with a clean environment.
fn talon() -> Command {
    let mut cmd = cargo_bin_cmd!("talon");
    for var in [
        "TALON_PORT",
        "TALON_DEFAULT_LAT",
        "TALON_DEFAULT_LON",
        "TALON_ETA_MINUTES",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    talon()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "emergency incident triage and dispatch service",
        ));
}

#[test]
fn version_exits_0() {
    talon()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("talon"));
}

#[test]
fn unknown_subcommand_fails() {
    talon().arg("dispatch-everything").assert().failure();
}

// ──────────────────────────────────────────────
// 2. Analyze subcommand
// ──────────────────────────────────────────────

#[test]
fn analyze_critical_report_text() {
    talon()
        .args(["analyze", "chest pain, can't breathe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("urgency: CRITICAL"))
        .stdout(predicate::str::contains("ALS Ambulance"))
        .stdout(predicate::str::contains("(H2)"));
}

#[test]
fn analyze_json_output_is_an_incident() {
    let output = talon()
        .args(["--output", "json", "analyze", "broken arm"])
        .output()
        .expect("run talon");
    assert!(output.status.success());

    let incident: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(incident["urgency"], "URGENT");
    assert_eq!(incident["status"], "CREATED");
    assert_eq!(incident["symptoms"], serde_json::json!(["fracture"]));
    assert_eq!(
        incident["audit_log"][0]["payload"]["unit_type"],
        "BLS Ambulance"
    );
}

#[test]
fn analyze_uses_given_location() {
    let output = talon()
        .args([
            "--output",
            "json",
            "analyze",
            "severe bleeding",
            "--lat",
            "23.28",
            "--lon",
            "77.45",
        ])
        .output()
        .expect("run talon");
    assert!(output.status.success());
    let incident: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(incident["audit_log"][0]["payload"]["resource_id"], "H3");
}

#[test]
fn analyze_lat_without_lon_is_usage_error() {
    talon()
        .args(["analyze", "chest pain", "--lat", "23.28"])
        .assert()
        .failure();
}

#[test]
fn analyze_blank_text_fails() {
    talon()
        .args(["analyze", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Text cannot be empty"));
}

#[test]
fn analyze_routine_has_no_recommendation() {
    talon()
        .args(["analyze", "mild headache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("urgency: ROUTINE"))
        .stdout(predicate::str::contains("recommendation").not());
}

// ──────────────────────────────────────────────
// 3. Simulate subcommand
// ──────────────────────────────────────────────

#[test]
fn simulate_json_summary() {
    let output = talon()
        .args(["--output", "json", "simulate", "--cases", "12"])
        .output()
        .expect("run talon");
    assert!(output.status.success());
    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(summary["requested"], 12);
    assert_eq!(summary["created"], 12);
    assert_eq!(summary["failed"], 0);
}

#[test]
fn simulate_rejects_too_many_cases() {
    talon()
        .args(["simulate", "--cases", "501"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at most 500"));
}

// ──────────────────────────────────────────────
// 4. Settings
// ──────────────────────────────────────────────

#[test]
fn config_file_changes_eta() {
    let file = config_file("[dispatch]\neta_minutes = 4\n");
    talon()
        .arg("--config")
        .arg(file.path())
        .args(["analyze", "seizure"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ETA 4 min"));
}

#[test]
fn config_resources_replace_registry() {
    let file = config_file(
        r#"
[[resources]]
id = "R9"
name = "Harbor Station"
lat = 23.25
lon = 77.42
beds = 2
"#,
    );
    talon()
        .arg("--config")
        .arg(file.path())
        .args(["analyze", "chest pain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Harbor Station (R9)"));
}

#[test]
fn env_override_changes_eta() {
    talon()
        .env("TALON_ETA_MINUTES", "9")
        .args(["analyze", "seizure"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ETA 9 min"));
}

#[test]
fn invalid_env_value_fails() {
    talon()
        .env("TALON_PORT", "not-a-port")
        .args(["analyze", "seizure"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TALON_PORT"));
}

#[test]
fn missing_config_file_fails() {
    talon()
        .args(["--config", "/nonexistent/talon.toml", "analyze", "seizure"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read config file"));
}

#[test]
fn malformed_config_json_error() {
    let file = config_file("port = \"eighty\"\n");
    let output = talon()
        .args(["--output", "json"])
        .arg("--config")
        .arg(file.path())
        .args(["analyze", "seizure"])
        .output()
        .unwrap();
    assert!(!output.status.success());

    // TOML errors span several lines; the report must still be one JSON value.
    let stderr = String::from_utf8(output.stderr).unwrap();
    let report: serde_json::Value =
        serde_json::from_str(stderr.trim()).expect("stderr is valid JSON");
    let message = report["error"].as_str().expect("error message");
    assert!(message.starts_with("invalid config file"), "{}", message);
    assert!(message.contains('\n'), "{}", message);
}
