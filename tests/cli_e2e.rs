#![cfg(feature = "cli")]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::tempdir;

fn run_cli(args: &[&str]) -> Output {
    let binary = PathBuf::from(env!("CARGO_BIN_EXE_race-harness"));
    Command::new(binary)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("cli command should run")
}

#[test]
fn e2e_guarded_order_run_is_clean() {
    let output = run_cli(&["run", "--scenario", "order", "--units", "5", "--guard", "entity", "--journal"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "status={:?}, stdout={stdout}, stderr={}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout.matches("collecting payment").count(), 1);
    assert!(stdout.contains("transitions: 1"));
    assert!(stdout.contains("clean"));
}

#[test]
fn e2e_unguarded_order_with_wide_window_exits_nonzero() {
    let output = run_cli(&[
        "run",
        "--scenario",
        "order",
        "--units",
        "5",
        "--guard",
        "none",
        "--window",
        "sleep:50000",
        "--format",
        "json",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("report should be valid json");
    assert_eq!(report["scenario"], "order");
    assert_eq!(report["guard"], "unguarded");
    assert!(report["transition_count"].as_u64().expect("count") > 1);
    assert_eq!(report["violation"]["invariant"], "payment transitions");
    assert_eq!(report["violation"]["unit_count"], 5);
}

#[test]
fn e2e_calibrate_reads_config_file_and_flags_override() {
    let tmp = tempdir().expect("tempdir should be created");
    let config_path = tmp.path().join("collection.json");
    fs::write(
        &config_path,
        r#"{"scenario":"collection","unit_count":4,"ops_per_unit":50,"guard":"unguarded","window":{"kind":"none"}}"#,
    )
    .expect("config should be written");

    let output = run_cli(&[
        "calibrate",
        "--config",
        config_path.to_str().expect("config path should be valid utf-8"),
        "--guard",
        "entity",
        "--trials",
        "10",
        "--format",
        "json",
    ]);
    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("report should be valid json");
    assert_eq!(report["scenario"], "collection");
    assert_eq!(report["guard"], "entity");
    assert_eq!(report["unit_count"], 4);
    assert_eq!(report["trials_run"], 10);
    assert_eq!(report["violations"], 0);
    assert_eq!(report["max_transition_count"], 200);
}

#[test]
fn e2e_invalid_window_is_rejected_by_argument_parsing() {
    let output = run_cli(&["run", "--window", "spin"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid contention window"));
}

#[test]
fn e2e_list_names_every_scenario() {
    let output = run_cli(&["list"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let names: Vec<&str> = stdout.lines().collect();
    assert_eq!(names, vec!["order", "lazy", "collection", "uploader", "wakeup"]);
}

#[test]
fn e2e_default_log_filter_shows_scenario_summary() {
    let binary = PathBuf::from(env!("CARGO_BIN_EXE_race-harness"));
    let output = Command::new(binary)
        .args(["run", "--scenario", "order", "--guard", "entity"])
        .env_remove("RUST_LOG")
        .output()
        .expect("cli command should run");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("scenario finished"), "stderr={stderr}");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("scenario finished"));
}

#[test]
fn e2e_zero_ops_is_a_config_error_not_a_race() {
    let output = run_cli(&["run", "--scenario", "order", "--ops", "0", "--format", "json"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ops_per_unit must be at least 1"), "stderr={stderr}");
}
