//! Binary-level tests for the `routeplane` command.

#![cfg(test)]
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const VALID: &str = r#"
gateway:
  admin_url: http://127.0.0.1:9
  admin_key: edd1c9f0
providers:
  - id: acme-1
    base_url: http://127.0.0.1:9/api
    auth_type: bearer
    token: t0k
  - id: acme-off
    enabled: false
    base_url: https://off.acme.test
"#;

fn write_config(content: &str) -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("routeplane.yaml");
    fs::write(&path, content).expect("write config");
    (dir, path)
}

fn routeplane() -> Command {
    let mut cmd = Command::cargo_bin("routeplane").expect("routeplane bin");
    cmd.env_remove("ROUTEPLANE_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn check_accepts_valid_config() {
    let (_dir, path) = write_config(VALID);

    routeplane()
        .arg("--config")
        .arg(&path)
        .arg("check")
        .assert()
        .success()
        .stdout(contains("acme-1"))
        .stdout(contains("acme-off"))
        .stdout(contains("configuration is valid"));
}

#[test]
fn check_json_lists_rejected_provider() {
    let config = format!(
        "{VALID}  - id: bad id!\n    base_url: https://api.acme.test\n"
    );
    let (_dir, path) = write_config(&config);

    let output = routeplane()
        .args(["-o", "json", "check", "-c"])
        .arg(&path)
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();

    let report: Value = serde_json::from_slice(&output).expect("json report");
    assert_eq!(report["valid"], true);
    assert_eq!(report["accepted"].as_array().map(Vec::len), Some(1));
    assert_eq!(report["rejected"][0]["index"], 2);
    assert_eq!(report["disabled"][0], "acme-off");
}

#[test]
fn missing_config_file_exits_with_config_code() {
    routeplane()
        .args(["--config", "/nonexistent/routeplane.yaml", "check"])
        .assert()
        .code(2)
        .stderr(contains("Configuration error"));
}

#[test]
fn invalid_gateway_section_exits_with_config_code() {
    let (_dir, path) = write_config(&VALID.replace("admin_key: edd1c9f0", "admin_key: \"\""));

    routeplane()
        .arg("-c")
        .arg(&path)
        .args(["provision", "--dry-run"])
        .assert()
        .code(2)
        .stderr(contains("gateway.admin_key"));
}

#[test]
fn unknown_provider_exits_with_config_code() {
    let (_dir, path) = write_config(VALID);

    routeplane()
        .arg("-c")
        .arg(&path)
        .args(["provision", "--dry-run", "--provider", "nope"])
        .assert()
        .code(2)
        .stderr(contains("Unknown provider 'nope'"));
}

#[test]
fn dry_run_with_unreachable_spec_fails_and_writes_snapshot() {
    let (dir, path) = write_config(VALID);
    let snapshot = dir.path().join("run.json");

    let output = routeplane()
        .arg("-c")
        .arg(&path)
        .args(["-o", "json", "provision", "--dry-run", "--snapshot"])
        .arg(&snapshot)
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let report: Value = serde_json::from_slice(&output).expect("json report");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["providers"][0]["state"]["provider_id"], "acme-1");
    assert_eq!(report["providers"][0]["state"]["phase"], "FAILED");
    assert_eq!(report["providers"][0]["error_kind"], "FetchError");
    assert_eq!(report["disabled"][0], "acme-off");

    let persisted: Value =
        serde_json::from_str(&fs::read_to_string(&snapshot).expect("snapshot")).expect("json");
    assert_eq!(persisted, report);
}
